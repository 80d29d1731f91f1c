//! Export command implementation.

use super::{open_engine, write_snapshot, CommandResult};
use std::path::Path;

/// Runs the export command.
///
/// The snapshot is loaded against the configuration first, so the export
/// drops anything the configuration no longer declares.
pub fn run(config: &Path, snapshot: &Path, output: &Path, cbor: bool) -> CommandResult<()> {
    if output == snapshot {
        return Err("Output must differ from the snapshot path".into());
    }
    let engine = open_engine(config, snapshot)?;
    write_snapshot(output, &engine.save(), cbor)?;
    println!(
        "Exported {} to {} ({})",
        snapshot.display(),
        output.display(),
        if cbor { "CBOR" } else { "JSON" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::Workspace;
    use crate::commands::{read_snapshot, report};

    #[test]
    fn json_to_cbor_and_back() {
        let ws = Workspace::new("save.json");
        report::apply(&ws.config, &ws.snapshot, "first_win", 55.0).unwrap();

        let cbor = ws.snapshot.with_file_name("save.cbor");
        run(&ws.config, &ws.snapshot, &cbor, true).unwrap();
        let decoded = read_snapshot(&cbor).unwrap();
        assert_eq!(decoded, read_snapshot(&ws.snapshot).unwrap());

        let json = ws.snapshot.with_file_name("copy.json");
        run(&ws.config, &cbor, &json, false).unwrap();
        assert_eq!(read_snapshot(&json).unwrap(), decoded);
    }

    #[test]
    fn export_onto_itself_is_refused() {
        let ws = Workspace::new("save.json");
        assert!(run(&ws.config, &ws.snapshot, &ws.snapshot, false).is_err());
    }
}
