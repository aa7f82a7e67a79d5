use chrono::NaiveDate;
use plancore::{DependencyKind, EngineConfig, Portfolio, Task};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
}

#[test]
fn test_writers_on_one_project_are_serialized() {
    let portfolio = Arc::new(Portfolio::new(EngineConfig::default()).unwrap());
    let project = portfolio.open("shared", start()).unwrap();
    project.add_task(Task::new("root", "root", start(), 1)).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let portfolio = Arc::clone(&portfolio);
            thread::spawn(move || {
                let project = portfolio.get("shared").unwrap();
                for i in 0..10 {
                    let id = format!("w{worker}-{i}");
                    project.add_task(Task::new(id.clone(), "t", start(), 2)).unwrap();
                    project
                        .add_dependency("root", &id, DependencyKind::FinishToStart, 0)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(project.with_graph(|g| g.task_count()).unwrap(), 81);
    assert_eq!(project.with_graph(|g| g.dependency_count()).unwrap(), 80);
    assert!(!project.is_schedule_stale().unwrap());
    assert_eq!(project.schedule().unwrap().unwrap().len(), 81);
}

#[test]
fn test_readers_only_see_complete_schedules() {
    let portfolio = Arc::new(Portfolio::new(EngineConfig::default()).unwrap());
    let project = portfolio.open("busy", start()).unwrap();
    project.add_task(Task::new("t0", "t0", start(), 1)).unwrap();

    let writer = {
        let project = Arc::clone(&project);
        thread::spawn(move || {
            for i in 1..60 {
                let id = format!("t{i}");
                let prev = format!("t{}", i - 1);
                project.add_task(Task::new(id.clone(), "t", start(), 1)).unwrap();
                project
                    .add_dependency(&prev, &id, DependencyKind::FinishToStart, 0)
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let project = Arc::clone(&project);
            thread::spawn(move || {
                for _ in 0..200 {
                    let Some(schedule) = project.schedule().unwrap() else {
                        continue;
                    };
                    // The newest task may not be linked into the chain yet.
                    let len = schedule.len() as i64;
                    assert!(schedule.length_days() == len || schedule.length_days() == len - 1);
                    assert!(schedule.tasks().all(|t| t.slack >= 0));
                    assert!(!schedule.critical_path().is_empty());
                    assert!(schedule
                        .critical_path()
                        .iter()
                        .all(|id| schedule.task(id).is_some()));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(project.schedule().unwrap().unwrap().length_days(), 60);
}

#[test]
fn test_concurrent_baselines_get_unique_sequence_numbers() {
    let portfolio = Arc::new(Portfolio::new(EngineConfig::default()).unwrap());
    let project = portfolio.open("baselines", start()).unwrap();
    project.add_task(Task::new("a", "a", start(), 4)).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let project = Arc::clone(&project);
            thread::spawn(move || project.create_baseline(None, None).unwrap().sequence_number)
        })
        .collect();
    let seen: HashSet<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(seen, (1..=8).collect::<HashSet<u32>>());

    let listed: Vec<u32> = project
        .list_baselines()
        .unwrap()
        .iter()
        .map(|b| b.sequence_number)
        .collect();
    assert_eq!(listed, (1..=8).collect::<Vec<_>>());
}

#[test]
fn test_projects_are_independent() {
    let portfolio = Arc::new(Portfolio::new(EngineConfig::default()).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let portfolio = Arc::clone(&portfolio);
            thread::spawn(move || {
                let id = format!("p{n}");
                let project = portfolio.open(&id, start()).unwrap();
                for i in 0..=n {
                    project
                        .add_task(Task::new(format!("t{i}"), "t", start(), 1))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for n in 0..4 {
        let project = portfolio.get(&format!("p{n}")).unwrap();
        assert_eq!(project.with_graph(|g| g.task_count()).unwrap(), n + 1);
    }
    portfolio.close("p0").unwrap();
    assert_eq!(portfolio.ids().unwrap(), vec!["p1", "p2", "p3"]);
}
