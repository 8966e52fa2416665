//! Trainer split, persistence and reload behavior.

use std::fs;
use std::path::Path;

use tickcast_core::synthetic::generate_history;
use tickcast_runner::{Dataset, Task, TrainError, Trainer};

fn dataset(rows: usize, task: Task) -> Dataset {
    Dataset::build(&generate_history(rows, 42), task).unwrap()
}

fn entries(dir: &Path) -> Vec<String> {
    match fs::read_dir(dir) {
        Ok(iter) => {
            let mut names: Vec<String> = iter
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }
        Err(_) => Vec::new(),
    }
}

#[test]
fn hundred_rows_split_seventy_thirty() {
    let dir = tempfile::tempdir().unwrap();
    let ds = dataset(100, Task::Regression);
    let outcome = Trainer::new(Task::Regression, dir.path())
        .train(&ds, false)
        .unwrap();

    let ts = ds.timestamps();
    assert_eq!(outcome.split.train.rows, 0..70);
    assert_eq!(outcome.split.test.rows, 70..100);
    assert_eq!(outcome.split.train.timestamps, ts[..70].to_vec());
    assert_eq!(outcome.split.test.timestamps, ts[70..].to_vec());
    assert_eq!(outcome.pipeline.metadata.train_rows, 70);
    assert_eq!(outcome.pipeline.metadata.train_end, ts[69]);
    assert!(outcome.artifact.is_none());
}

#[test]
fn reloaded_pipeline_predicts_identically() {
    for task in Task::ALL {
        let dir = tempfile::tempdir().unwrap();
        let ds = dataset(120, task);
        let trainer = Trainer::new(task, dir.path());

        let outcome = trainer.train(&ds, true).unwrap();
        let path = outcome.artifact.clone().unwrap();
        assert!(path.exists());

        let loaded = trainer.load().unwrap();
        assert_eq!(loaded, outcome.pipeline);
        assert_eq!(
            loaded.predict(ds.features()).unwrap(),
            outcome.pipeline.predict(ds.features()).unwrap()
        );
    }
}

#[test]
fn persist_false_never_touches_slot() {
    let dir = tempfile::tempdir().unwrap();
    let artifact_dir = dir.path().join("models");
    let trainer = Trainer::new(Task::Classification, &artifact_dir);
    let ds = dataset(50, Task::Classification);

    trainer.train(&ds, false).unwrap();
    trainer.train(&ds, false).unwrap();

    assert!(!artifact_dir.exists());
    assert!(matches!(
        trainer.load(),
        Err(TrainError::ArtifactNotFound(_))
    ));
}

#[test]
fn persist_false_leaves_existing_slot_alone() {
    let dir = tempfile::tempdir().unwrap();
    let trainer = Trainer::new(Task::Regression, dir.path());
    let first = trainer.train(&dataset(50, Task::Regression), true).unwrap();
    let before = fs::read(first.artifact.as_ref().unwrap()).unwrap();

    let other = Dataset::build(&generate_history(80, 7), Task::Regression).unwrap();
    trainer.train(&other, false).unwrap();

    assert_eq!(fs::read(first.artifact.unwrap()).unwrap(), before);
    assert_eq!(entries(dir.path()), vec!["lr_model.json".to_string()]);
}

#[test]
fn failed_save_keeps_previous_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let reg = Trainer::new(Task::Regression, dir.path());
    let first = reg.train(&dataset(50, Task::Regression), true).unwrap();

    // The classification slot is occupied by a directory, so its save fails.
    let cls = Trainer::new(Task::Classification, dir.path());
    let slot = cls.store().slot_path(Task::Classification);
    fs::create_dir(&slot).unwrap();
    fs::write(slot.join("occupied"), b"x").unwrap();

    let err = cls
        .train(&dataset(50, Task::Classification), true)
        .unwrap_err();
    assert!(matches!(err, TrainError::Io(_)), "got {err:?}");

    assert_eq!(
        entries(dir.path()),
        vec!["lgr_model.json".to_string(), "lr_model.json".to_string()]
    );
    assert_eq!(reg.load().unwrap(), first.pipeline);
}

#[test]
fn trainers_sharing_a_slot_save_concurrently() {
    let dir = tempfile::tempdir().unwrap();
    let ds = dataset(60, Task::Regression);

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                let trainer = Trainer::new(Task::Regression, dir.path());
                for _ in 0..5 {
                    trainer.train(&ds, true).unwrap();
                    assert_eq!(trainer.load().unwrap().task(), Task::Regression);
                }
            });
        }
    });

    assert_eq!(entries(dir.path()), vec!["lr_model.json".to_string()]);
}

#[test]
fn slots_are_independent_per_task() {
    let dir = tempfile::tempdir().unwrap();
    Trainer::new(Task::Regression, dir.path())
        .train(&dataset(40, Task::Regression), true)
        .unwrap();
    Trainer::new(Task::Classification, dir.path())
        .train(&dataset(40, Task::Classification), true)
        .unwrap();

    assert_eq!(
        entries(dir.path()),
        vec!["lgr_model.json".to_string(), "lr_model.json".to_string()]
    );
    assert_eq!(
        Trainer::new(Task::Regression, dir.path()).load().unwrap().task(),
        Task::Regression
    );
    assert_eq!(
        Trainer::new(Task::Classification, dir.path()).load().unwrap().task(),
        Task::Classification
    );
}
