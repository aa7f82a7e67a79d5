use chrono::NaiveDate;
use plancore::{
    CriticalPathConfig, CriticalPathScheduler, DependencyKind, EngineConfig, ErrorKind,
    GraphError, Project, ProjectGraph, Task,
};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::new("plancore=trace"))
        .try_init();
}

/// A(3) -FS0-> B(2) -FS1-> C(4)
fn abc() -> ProjectGraph {
    let mut graph = ProjectGraph::new("scenario");
    graph.add_task(Task::new("A", "A", start(), 3)).unwrap();
    graph.add_task(Task::new("B", "B", start(), 2)).unwrap();
    graph.add_task(Task::new("C", "C", start(), 4)).unwrap();
    graph
        .connect("A", "B", DependencyKind::FinishToStart, 0)
        .unwrap();
    graph
        .connect("B", "C", DependencyKind::FinishToStart, 1)
        .unwrap();
    graph
}

fn scheduler() -> CriticalPathScheduler {
    CriticalPathScheduler::new(start(), CriticalPathConfig::default())
}

#[test]
fn test_chain_offsets_and_critical_path() {
    let schedule = scheduler().schedule(&abc()).unwrap();

    let offsets = |id: &str| {
        let t = schedule.task(id).unwrap().timing;
        (t.earliest_start, t.earliest_finish)
    };
    assert_eq!(offsets("A"), (0, 3));
    assert_eq!(offsets("B"), (3, 5));
    assert_eq!(offsets("C"), (6, 10));
    assert_eq!(schedule.length_days(), 10);
    assert!(schedule.tasks().all(|t| t.is_critical && t.slack == 0));
}

#[test]
fn test_side_branch_has_slack() {
    let mut graph = abc();
    graph.add_task(Task::new("D", "D", start(), 1)).unwrap();
    graph
        .connect("A", "D", DependencyKind::FinishToStart, 0)
        .unwrap();

    let schedule = scheduler().schedule(&graph).unwrap();
    let d = schedule.task("D").unwrap();
    assert_eq!(d.timing.earliest_start, 3);
    assert_eq!(d.timing.earliest_finish, 4);
    assert_eq!(d.timing.latest_finish, 10);
    assert_eq!(d.timing.latest_start, 9);
    assert_eq!(d.slack, 6);
    assert!(!d.is_critical);
    assert_eq!(schedule.critical_path(), ["A", "B", "C"]);
}

#[test]
fn test_cycle_closing_edge_rejected() {
    let mut graph = abc();
    let revision = graph.revision();
    let err = graph
        .connect("C", "A", DependencyKind::FinishToStart, 0)
        .unwrap_err();
    assert_eq!(
        err,
        GraphError::CircularDependency {
            predecessor: "C".to_string(),
            successor: "A".to_string()
        }
    );
    assert_eq!(graph.dependency_count(), 2);
    assert_eq!(graph.revision(), revision);
}

#[test]
fn test_project_flow_with_logging() {
    init_tracing();
    let config = EngineConfig {
        verbosity: 3,
        ..Default::default()
    };
    let project = Project::new("logged", start(), config).unwrap();
    project.add_task(Task::new("A", "Design", start(), 3)).unwrap();
    project.add_task(Task::new("B", "Build", start(), 2)).unwrap();
    project
        .add_dependency("A", "B", DependencyKind::StartToStart, 1)
        .unwrap();
    assert_eq!(
        project
            .add_dependency("A", "B", DependencyKind::FinishToStart, 0)
            .unwrap_err()
            .kind(),
        ErrorKind::DuplicateDependency
    );

    let schedule = project.schedule().unwrap().unwrap();
    assert_eq!(schedule.length_days(), 3);
    let baseline = project.create_baseline(None, Some("lead".into())).unwrap();
    assert_eq!(baseline.sequence_number, 1);

    let gantt: serde_json::Value =
        serde_json::from_str(&project.gantt().unwrap().to_json().unwrap()).unwrap();
    assert_eq!(gantt["links"][0]["type"], "ss");
    assert_eq!(gantt["links"][0]["lag"], 1);
}
