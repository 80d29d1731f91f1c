//! Property tests for the reconciliation engine.

use laurel_engine::ReportOutcome;
use laurel_testkit::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn percentages<G: laurel_engine::RemoteGateway>(
    engine: &laurel_engine::ReconciliationEngine<G>,
) -> BTreeMap<String, f64> {
    engine
        .achievements()
        .into_iter()
        .map(|a| (a.id, a.percentage_completed))
        .collect()
}

proptest! {
    #[test]
    fn progress_never_regresses(reports in report_sequence_strategy(40)) {
        let mut engine = offline_engine();
        let mut expected: BTreeMap<String, f64> = BTreeMap::new();

        for (id, value) in &reports {
            let before = engine.achievement(id).unwrap().percentage_completed;
            engine.report_progress(id, *value).unwrap();
            let after = engine.achievement(id).unwrap().percentage_completed;
            prop_assert!(after >= before);

            let best = expected.entry(id.clone()).or_insert(0.0);
            *best = best.max(value.clamp(0.0, 100.0));
        }

        for (id, value) in &expected {
            prop_assert_eq!(engine.achievement(id).unwrap().percentage_completed, *value);
        }
    }

    #[test]
    fn completion_absorbs_further_reports(
        id in achievement_id_strategy(),
        later in prop::collection::vec(reported_value_strategy(), 1..10),
    ) {
        let mut engine = offline_engine();
        engine.report_progress(&id, 100.0).unwrap();
        let events = RecordingObserver::attach(&mut engine);

        for value in later {
            prop_assert_eq!(engine.report_progress(&id, value).unwrap(), ReportOutcome::Unchanged);
        }
        prop_assert!(events.events().is_empty());
        prop_assert_eq!(engine.pending().to_map().get(&id).copied(), Some(100.0));
    }

    #[test]
    fn save_then_load_reproduces_progress(reports in report_sequence_strategy(20)) {
        let mut engine = offline_engine();
        for (id, value) in &reports {
            engine.report_progress(id, *value).unwrap();
        }
        let snapshot = engine.save();

        let mut restored = offline_engine();
        restored.load(&snapshot);
        prop_assert_eq!(percentages(&restored), percentages(&engine));
        prop_assert_eq!(restored.pending().to_map(), engine.pending().to_map());
    }

    #[test]
    fn snapshots_survive_both_encodings(snapshot in snapshot_strategy()) {
        let mut from_cbor = offline_engine();
        from_cbor.load(&laurel_protocol::Snapshot::from_cbor(&snapshot.to_cbor().unwrap()).unwrap());
        let mut from_json = offline_engine();
        from_json.load(&laurel_protocol::Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap());

        for (id, value) in &snapshot.achievements {
            prop_assert_eq!(from_cbor.achievement(id).unwrap().percentage_completed, *value);
            // JSON float parsing may land one ulp away.
            let parsed = from_json.achievement(id).unwrap().percentage_completed;
            prop_assert!((parsed - value).abs() < 1e-9);
        }
    }

    #[test]
    fn merge_is_symmetric(local in progress_map_strategy(), remote in progress_map_strategy()) {
        let mut left = offline_engine();
        for (id, value) in &local {
            left.report_progress(id, *value).unwrap();
        }
        left.merge_remote(&remote);

        let mut right = offline_engine();
        for (id, value) in &remote {
            right.report_progress(id, *value).unwrap();
        }
        right.merge_remote(&local);

        prop_assert_eq!(percentages(&left), percentages(&right));
        for id in ACHIEVEMENT_IDS {
            let expected = local.get(id).copied().unwrap_or(0.0)
                .max(remote.get(id).copied().unwrap_or(0.0));
            prop_assert_eq!(left.achievement(id).unwrap().percentage_completed, expected);
        }
    }

    #[test]
    fn failing_gateway_retains_queue(
        reports in report_sequence_strategy(15),
        flushes in 1usize..5,
    ) {
        let (mut engine, gateway) = online_engine("p1");
        for (id, value) in &reports {
            engine.report_progress(id, *value).unwrap();
        }
        let queued = engine.pending().to_map();

        gateway.set_fail_submissions(true);
        for _ in 0..flushes {
            engine.flush();
            prop_assert_eq!(engine.pending().to_map(), queued.clone());
        }

        gateway.set_fail_submissions(false);
        engine.flush();
        prop_assert!(engine.pending().is_empty());
        prop_assert!(engine.failed().is_empty());
        for (id, value) in &queued {
            prop_assert_eq!(gateway.remote_achievements().get(id).copied(), Some(*value));
        }
    }

    #[test]
    fn unknown_ids_change_nothing(id in unknown_id_strategy(), value in reported_value_strategy()) {
        let mut engine = offline_engine();
        prop_assert!(engine.report_progress(&id, value).is_err());
        prop_assert!(engine.pending().is_empty());
        prop_assert!(percentages(&engine).values().all(|p| *p == 0.0));
    }

    #[test]
    fn queued_scores_are_restored(scores in queued_scores_strategy(10)) {
        let snapshot = laurel_protocol::Snapshot {
            queued_scores: scores.clone(),
            ..Default::default()
        };
        let mut engine = offline_engine();
        engine.load(&snapshot);
        prop_assert_eq!(engine.queued_scores().records(), scores);
    }
}
