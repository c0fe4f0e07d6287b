//! Integration tests for the kerneld host runtime

use core_types::SchedulingAlgorithm;
use kerneld::{load_script, HostError, HostRuntime, HostRuntimeConfig, ScriptError};
use sim_kernel::KernelConfig;
use std::io::Write;
use tempfile::{Builder, NamedTempFile};

fn config(algorithm: SchedulingAlgorithm) -> HostRuntimeConfig {
    HostRuntimeConfig {
        kernel: KernelConfig::new(algorithm),
        max_steps: 0,
    }
}

fn replay_file(algorithm: SchedulingAlgorithm, file: &NamedTempFile) -> String {
    let script = load_script(file.path()).unwrap();
    let mut runtime = HostRuntime::new(config(algorithm), script).unwrap();
    let mut out = Vec::new();
    runtime.run(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_line_script_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "# two processes share a semaphore\n\
         arrive 1 1 Foreground 1MiB\n\
         arrive 2 1 Foreground 1MiB\n\
         sem_init 1 0\n\
         sem_p 1      # 1 blocks\n\
         sem_v 1      # 2 releases it\n\
         exit\n\
         exit"
    )
    .unwrap();

    let output = replay_file(SchedulingAlgorithm::Fcfs, &file);
    assert_eq!(output, "1\n1\n1\n2\n2\n1\n0\n");
}

#[test]
fn test_json_script_from_file() {
    let mut file = Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"[
            {{"event": "process_arrived", "pid": 1, "priority": 5, "process_type": "Foreground", "memory_needed": 2097152}},
            {{"event": "process_arrived", "pid": 2, "priority": 1, "process_type": "Foreground", "memory_needed": 2097152}},
            {{"event": "exit"}}
        ]"#
    )
    .unwrap();

    let output = replay_file(SchedulingAlgorithm::Priority, &file);
    assert_eq!(output, "1\n2\n1\n");
}

#[test]
fn test_multilevel_script() {
    let mut file = NamedTempFile::new().unwrap();
    let mut script = String::from("arrive 1 1 Foreground 1MiB\narrive 2 1 Background 1MiB\n");
    for _ in 0..20 {
        script.push_str("tick\n");
    }
    file.write_all(script.as_bytes()).unwrap();

    let output = replay_file(SchedulingAlgorithm::Multilevel, &file);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 22);
    assert!(lines[..21].iter().all(|line| *line == "1"));
    assert_eq!(lines[21], "2");
}

#[test]
fn test_failures_render_in_place() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "arrive 1 1 Foreground 12MiB\narrive 1 1 Foreground 1MiB\nlock 7\nmutex_init 7\nunlock 7"
    )
    .unwrap();

    let output = replay_file(SchedulingAlgorithm::RoundRobin, &file);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "-1");
    assert_eq!(lines[1], "1");
    assert_eq!(lines[2], "error: Unknown mutex: Mutex(7)");
    assert_eq!(lines[3], "1");
    assert_eq!(lines[4], "error: Process 1 does not own Mutex(7)");
}

#[test]
fn test_bad_script_reports_line() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "tick\narrive 1 1 Foreground").unwrap();

    let result = load_script(file.path());
    assert!(matches!(
        result,
        Err(HostError::Script(ScriptError::ParseError { line: 2, .. }))
    ));
}

#[test]
fn test_missing_script_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_script(&dir.path().join("absent.events"));
    assert!(matches!(result, Err(HostError::ReadScript { .. })));
}

#[test]
fn test_bundled_demos_replay() {
    let demos = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos");
    let cases = [
        ("priority.events", SchedulingAlgorithm::Priority, "1\n2\n1\n1\n1\n1\n3\n1\n3\n3\n1\n0\n"),
        ("semaphore.json", SchedulingAlgorithm::Fcfs, "1\n1\n1\n2\n2\n1\n0\n"),
    ];
    for (name, algorithm, expected) in cases {
        let script = load_script(&demos.join(name)).unwrap();
        let mut runtime = HostRuntime::new(config(algorithm), script).unwrap();
        let mut out = Vec::new();
        runtime.run(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), expected, "{}", name);
    }

    let script = load_script(&demos.join("multilevel.events")).unwrap();
    let mut runtime = HostRuntime::new(config(SchedulingAlgorithm::Multilevel), script).unwrap();
    runtime.run(&mut std::io::sink()).unwrap();
    assert_eq!(runtime.outputs()[22], "3");
    assert_eq!(runtime.outputs().last(), Some(&"-1"));
}
