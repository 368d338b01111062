//! Dependency graph analysis.
//!
//! Tasks and subtasks become nodes of an index-based graph keyed by their
//! full identifier ("3", "3.2"). Every traversal is iterative, so deep
//! dependency chains cannot overflow the stack.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::entities::Task;
use crate::errors::{TasksError, TasksResult};
use crate::storage::Storage;

/// A dependency cycle. The first identifier is repeated at the end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Cycle {
    pub path: Vec<String>,
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path.join(" -> "))
    }
}

impl From<Cycle> for TasksError {
    fn from(cycle: Cycle) -> Self {
        TasksError::CircularDependency { cycle: cycle.path }
    }
}

/// A dependency on an identifier that names no task or subtask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingDependency {
    pub from: String,
    pub to: String,
}

/// Result of dependency validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyReport {
    pub cycles: Vec<Cycle>,
    pub dangling: Vec<DanglingDependency>,
}

impl DependencyReport {
    pub fn is_valid(&self) -> bool {
        self.cycles.is_empty() && self.dangling.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Unvisited,
    InProgress,
    Done,
}

struct Frame {
    node: usize,
    next_edge: usize,
}

/// Arena of task and subtask nodes with resolved dependency edges.
struct DependencyGraph {
    labels: Vec<String>,
    index: HashMap<String, usize>,
    edges: Vec<Vec<usize>>,
    dangling: Vec<DanglingDependency>,
}

impl DependencyGraph {
    fn build(tasks: &[Task]) -> Self {
        let mut graph = Self {
            labels: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            dangling: Vec::new(),
        };

        for task in tasks {
            graph.add_node(task.id.to_string());
            for subtask in &task.subtasks {
                graph.add_node(subtask.full_id(task.id).to_string());
            }
        }

        for task in tasks {
            let from = task.id.to_string();
            for dep in &task.dependencies {
                graph.add_edge(&from, dep.trim().to_string());
            }

            for subtask in &task.subtasks {
                let from = subtask.full_id(task.id).to_string();
                for dep in &subtask.dependencies {
                    let target = graph.resolve_subtask_dep(task.id, dep.trim());
                    graph.add_edge(&from, target);
                }
            }
        }

        graph
    }

    fn add_node(&mut self, label: String) {
        if self.index.contains_key(&label) {
            return;
        }
        self.index.insert(label.clone(), self.labels.len());
        self.labels.push(label);
        self.edges.push(Vec::new());
    }

    fn add_edge(&mut self, from: &str, to: String) {
        let Some(&from_idx) = self.index.get(from) else {
            return;
        };
        match self.index.get(&to) {
            Some(&to_idx) => {
                if !self.edges[from_idx].contains(&to_idx) {
                    self.edges[from_idx].push(to_idx);
                }
            }
            None => self.dangling.push(DanglingDependency {
                from: from.to_string(),
                to,
            }),
        }
    }

    /// A bare number inside a subtask names a sibling when one exists,
    /// otherwise a top-level task.
    fn resolve_subtask_dep(&self, parent_id: u32, dep: &str) -> String {
        if dep.contains('.') {
            return dep.to_string();
        }
        let sibling = format!("{parent_id}.{dep}");
        if self.index.contains_key(&sibling) {
            sibling
        } else {
            dep.to_string()
        }
    }

    fn node(&self, id: &str) -> Option<usize> {
        self.index.get(id.trim()).copied()
    }

    fn cycles(&self) -> Vec<Cycle> {
        let mut colors = vec![Color::Unvisited; self.labels.len()];
        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        let mut cycles = Vec::new();

        for root in 0..self.labels.len() {
            if colors[root] != Color::Unvisited {
                continue;
            }

            colors[root] = Color::InProgress;
            let mut stack = vec![Frame {
                node: root,
                next_edge: 0,
            }];

            while let Some(frame) = stack.last_mut() {
                let node = frame.node;
                let next = self.edges[node].get(frame.next_edge).copied();
                frame.next_edge += 1;

                let Some(dep) = next else {
                    colors[node] = Color::Done;
                    stack.pop();
                    continue;
                };

                match colors[dep] {
                    Color::Unvisited => {
                        colors[dep] = Color::InProgress;
                        stack.push(Frame {
                            node: dep,
                            next_edge: 0,
                        });
                    }
                    Color::InProgress => {
                        // The stack is the current path from the root
                        let start = stack.iter().position(|f| f.node == dep).unwrap_or(0);
                        let mut path: Vec<usize> = stack[start..].iter().map(|f| f.node).collect();
                        path.push(dep);
                        if seen.insert(path.clone()) {
                            cycles.push(Cycle {
                                path: path.iter().map(|&i| self.labels[i].clone()).collect(),
                            });
                        }
                    }
                    Color::Done => {}
                }
            }
        }

        cycles
    }

    /// Whether `target` is reachable from `start` through one or more edges.
    fn reaches(&self, start: usize, target: usize) -> bool {
        let mut visited = vec![false; self.labels.len()];
        let mut stack: Vec<usize> = self.edges[start].clone();

        while let Some(node) = stack.pop() {
            if node == target {
                return true;
            }
            if !visited[node] {
                visited[node] = true;
                stack.extend(self.edges[node].iter().copied());
            }
        }

        false
    }
}

/// Find dependency cycles among tasks and subtasks.
///
/// Dependencies on unknown identifiers are ignored here; see [`validate`].
pub fn detect_cycles(tasks: &[Task]) -> Vec<Cycle> {
    DependencyGraph::build(tasks).cycles()
}

/// Whether `task` depends on `target_id`, directly or transitively.
///
/// Returns false when the target does not exist.
pub fn has_dependency(task: &Task, target_id: &str, all_tasks: &[Task]) -> bool {
    let graph = DependencyGraph::build(all_tasks);
    match (graph.node(&task.id.to_string()), graph.node(target_id)) {
        (Some(start), Some(target)) => graph.reaches(start, target),
        _ => false,
    }
}

/// Whether adding the edge `from -> to` would close a cycle.
pub fn would_create_cycle(tasks: &[Task], from: &str, to: &str) -> bool {
    if from.trim() == to.trim() {
        return true;
    }
    let graph = DependencyGraph::build(tasks);
    match (graph.node(from), graph.node(to)) {
        (Some(from), Some(to)) => graph.reaches(to, from),
        _ => false,
    }
}

/// Check the whole dependency graph for cycles and dangling references.
pub fn validate(tasks: &[Task]) -> DependencyReport {
    let graph = DependencyGraph::build(tasks);
    let report = DependencyReport {
        cycles: graph.cycles(),
        dangling: graph.dangling,
    };

    tracing::debug!(
        cycles = report.cycles.len(),
        dangling = report.dangling.len(),
        "Validated dependencies"
    );
    report
}

/// Dependency domain facade providing dependency checks over stored tasks
pub struct DependencyDomain {
    storage: Arc<dyn Storage>,
}

impl DependencyDomain {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Validate all dependencies in a tasks file
    pub async fn validate(&self, tasks_path: &Path) -> TasksResult<DependencyReport> {
        let tasks = self.storage.load_tasks(tasks_path).await?;
        Ok(validate(&tasks))
    }

    /// Check that `from` may depend on `to`.
    ///
    /// Fails when either side is unknown or the new edge would close a cycle.
    pub async fn check_new_dependency(
        &self,
        tasks_path: &Path,
        from: &str,
        to: &str,
    ) -> TasksResult<()> {
        let tasks = self.storage.load_tasks(tasks_path).await?;
        let graph = DependencyGraph::build(&tasks);

        let from_idx = graph.node(from).ok_or_else(|| TasksError::TaskNotFound {
            task_id: from.to_string(),
        })?;
        let to_idx = graph.node(to).ok_or_else(|| TasksError::InvalidDependency {
            task_id: from.to_string(),
            dep_id: to.to_string(),
        })?;

        if from_idx == to_idx || graph.reaches(to_idx, from_idx) {
            let mut path = vec![graph.labels[from_idx].clone()];
            path.extend(path_between(&graph, to_idx, from_idx));
            return Err(Cycle { path }.into());
        }

        Ok(())
    }
}

/// Labels along one path from `start` to `target`, both included.
fn path_between(graph: &DependencyGraph, start: usize, target: usize) -> Vec<String> {
    let mut parent: Vec<Option<usize>> = vec![None; graph.labels.len()];
    let mut visited = vec![false; graph.labels.len()];
    let mut stack = vec![start];
    visited[start] = true;

    while let Some(node) = stack.pop() {
        if node == target {
            break;
        }
        for &next in &graph.edges[node] {
            if !visited[next] {
                visited[next] = true;
                parent[next] = Some(node);
                stack.push(next);
            }
        }
    }

    let mut path = vec![graph.labels[target].clone()];
    let mut current = target;
    while let Some(prev) = parent[current] {
        path.push(graph.labels[prev].clone());
        current = prev;
    }
    if current != start {
        path.push(graph.labels[start].clone());
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Subtask;
    use crate::storage::FileStorage;
    use tempfile::TempDir;

    fn task(id: u32, deps: &[&str]) -> Task {
        Task::new(id, format!("Task {id}"), "").with_dependencies(deps.iter().copied())
    }

    #[test]
    fn test_two_node_cycle() {
        let cycles = detect_cycles(&[task(1, &["2"]), task(2, &["1"])]);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].to_string(), "1 -> 2 -> 1");
    }

    #[test]
    fn test_acyclic_graph() {
        let tasks = [task(1, &[]), task(2, &["1"]), task(3, &["1", "2"])];
        assert!(detect_cycles(&tasks).is_empty());
    }

    #[test]
    fn test_self_dependency() {
        let cycles = detect_cycles(&[task(1, &["1"])]);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].path, vec!["1", "1"]);
    }

    #[test]
    fn test_cycle_reached_from_outside() {
        // 4 leads into the 1 -> 2 -> 3 -> 1 loop
        let tasks = [
            task(4, &["1"]),
            task(1, &["2"]),
            task(2, &["3"]),
            task(3, &["1"]),
        ];
        let cycles = detect_cycles(&tasks);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].to_string(), "1 -> 2 -> 3 -> 1");
    }

    #[test]
    fn test_dangling_skipped_by_detection_but_reported_by_validate() {
        let tasks = [task(1, &["99"]), task(2, &["1"])];
        assert!(detect_cycles(&tasks).is_empty());

        let report = validate(&tasks);
        assert!(!report.is_valid());
        assert_eq!(
            report.dangling,
            vec![DanglingDependency {
                from: "1".to_string(),
                to: "99".to_string()
            }]
        );
    }

    #[test]
    fn test_subtask_dependencies() {
        let mut parent = task(5, &[]);
        parent.add_subtask(Subtask::new(1, "Schema", ""));
        parent.add_subtask(Subtask::new(2, "API", "").with_dependencies(["1"]));
        parent.add_subtask(Subtask::new(3, "UI", "").with_dependencies(["5.2", "7"]));
        let mut other = task(7, &[]);
        other.add_subtask(Subtask::new(1, "Back", "").with_dependencies(["5.3"]));

        let tasks = [parent, other];
        assert!(validate(&tasks).is_valid());

        // Subtask 5.1 loops through 7.1 when 7 depends on 5.3
        let mut looped = tasks.to_vec();
        looped[0].subtasks[0].dependencies.push("7.1".to_string());
        let cycles = detect_cycles(&looped);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].to_string(), "5.1 -> 7.1 -> 5.3 -> 5.2 -> 5.1");
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let tasks: Vec<Task> = (1..=20_000)
            .map(|id| {
                let deps = if id > 1 { vec![(id - 1).to_string()] } else { Vec::new() };
                Task::new(id, "step", "").with_dependencies(deps)
            })
            .collect();
        assert!(detect_cycles(&tasks).is_empty());
        assert!(has_dependency(&tasks[19_999], "1", &tasks));
    }

    #[test]
    fn test_has_dependency() {
        let tasks = [task(1, &[]), task(2, &["1"]), task(3, &["2"]), task(4, &["9"])];
        assert!(has_dependency(&tasks[2], "1", &tasks));
        assert!(has_dependency(&tasks[2], "2", &tasks));
        assert!(!has_dependency(&tasks[0], "3", &tasks));
        assert!(!has_dependency(&tasks[3], "9", &tasks));
        assert!(!has_dependency(&tasks[2], "42", &tasks));
    }

    #[test]
    fn test_has_dependency_terminates_on_cycles() {
        let tasks = [task(1, &["2"]), task(2, &["1"]), task(3, &[])];
        assert!(has_dependency(&tasks[0], "1", &tasks));
        assert!(!has_dependency(&tasks[0], "3", &tasks));
    }

    #[test]
    fn test_would_create_cycle() {
        let tasks = [task(1, &[]), task(2, &["1"]), task(3, &["2"])];
        assert!(would_create_cycle(&tasks, "1", "3"));
        assert!(would_create_cycle(&tasks, "2", "2"));
        assert!(!would_create_cycle(&tasks, "3", "1"));
    }

    #[tokio::test]
    async fn test_domain_checks_new_dependency() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(
            &path,
            r#"{"tasks": [{"id": 1, "title": "A"}, {"id": 2, "title": "B", "dependencies": [1]}, {"id": 3, "title": "C", "dependencies": ["2"]}]}"#,
        )
        .unwrap();

        let domain = DependencyDomain::new(Arc::new(FileStorage::new(dir.path())));
        assert!(domain.validate(&path).await.unwrap().is_valid());
        assert!(domain.check_new_dependency(&path, "3", "1").await.is_ok());

        match domain.check_new_dependency(&path, "1", "3").await {
            Err(TasksError::CircularDependency { cycle }) => {
                assert_eq!(cycle, vec!["1", "3", "2", "1"]);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }

        assert!(matches!(
            domain.check_new_dependency(&path, "1", "8").await,
            Err(TasksError::InvalidDependency { .. })
        ));
        assert!(matches!(
            domain.check_new_dependency(&path, "8", "1").await,
            Err(TasksError::TaskNotFound { .. })
        ));
    }
}
