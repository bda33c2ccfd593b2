//! File inclusion through the compiler.

use std::fs;

use quiver_qasm::{Executor, QasmCompiler, QasmError};
use tempfile::TempDir;

#[derive(Default)]
struct Gates {
    qubits: usize,
    count: usize,
}

impl Executor for Gates {
    type Error = QasmError;

    fn num_qubits(&self) -> usize {
        self.qubits
    }

    fn add_qubits(&mut self, count: usize, _register: &str) -> Result<(), QasmError> {
        self.qubits += count;
        Ok(())
    }

    fn apply_u(&mut self, _: f64, _: f64, _: f64, _: usize) -> Result<(), QasmError> {
        self.count += 1;
        Ok(())
    }

    fn apply_cx(&mut self, _: usize, _: usize) -> Result<(), QasmError> {
        self.count += 1;
        Ok(())
    }

    fn measure(&mut self, _: usize) -> Result<u8, QasmError> {
        Ok(0)
    }

    fn reset(&mut self, _: usize) -> Result<(), QasmError> {
        Ok(())
    }

    fn show_probabilities(&mut self) -> Result<(), QasmError> {
        Ok(())
    }

    fn snapshot(&mut self, _: &str) -> Result<(), QasmError> {
        Ok(())
    }
}

fn write(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn test_nested_includes_resume_outer_file() {
    let dir = TempDir::new().unwrap();
    write(&dir, "inner.inc", "gate flip a { U(pi,0,pi) a; }\n");
    write(
        &dir,
        "outer.inc",
        "include \"inner.inc\";\ngate twice a { flip a; flip a; }\n",
    );
    let main = write(
        &dir,
        "main.qasm",
        "OPENQASM 2.0;\ninclude \"outer.inc\";\nqreg q[2];\ntwice q;\nflip q[1];\n",
    );

    let mut compiler = QasmCompiler::from_file(&main).unwrap();
    let mut gates = Gates::default();
    compiler.run(&mut gates).unwrap();

    assert_eq!(gates.qubits, 2);
    assert_eq!(gates.count, 5);
    assert!(compiler.catalog().contains("flip"));
    assert!(compiler.catalog().contains("twice"));
}

#[test]
fn test_empty_include_is_transparent() {
    let dir = TempDir::new().unwrap();
    write(&dir, "empty.inc", "");
    write(&dir, "comments.inc", "// nothing here\n\n");
    let main = write(
        &dir,
        "main.qasm",
        "OPENQASM 2.0;\ninclude \"empty.inc\";\ninclude \"comments.inc\";\nqreg q[1];\nU(0,0,0) q[0];\n",
    );

    let mut gates = Gates::default();
    QasmCompiler::from_file(&main).unwrap().run(&mut gates).unwrap();
    assert_eq!(gates.count, 1);
}

#[test]
fn test_local_library_shadows_bundled_copy() {
    let dir = TempDir::new().unwrap();
    write(&dir, "qelib1.inc", "gate h a { U(0,0,0) a; U(0,0,0) a; }\n");
    let main = write(
        &dir,
        "main.qasm",
        "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[1];\nh q[0];\n",
    );

    let mut compiler = QasmCompiler::from_file(&main).unwrap();
    let mut gates = Gates::default();
    compiler.run(&mut gates).unwrap();
    assert_eq!(gates.count, 2);
    assert!(!compiler.catalog().contains("ccx"));
}

#[test]
fn test_missing_include_fails() {
    let dir = TempDir::new().unwrap();
    let main = write(
        &dir,
        "main.qasm",
        "OPENQASM 2.0;\ninclude \"nowhere.inc\";\n",
    );

    let err = QasmCompiler::from_file(&main)
        .unwrap()
        .run(&mut Gates::default())
        .unwrap_err();
    assert!(matches!(err, QasmError::Io { ref path, .. } if path.contains("nowhere.inc")));
}

#[test]
fn test_missing_program_file() {
    let dir = TempDir::new().unwrap();
    let result = QasmCompiler::from_file(&dir.path().join("absent.qasm"));
    assert!(matches!(result, Err(QasmError::Io { .. })));
}

#[test]
fn test_rewind_rereads_includes() {
    let dir = TempDir::new().unwrap();
    write(&dir, "lib.inc", "gate g a { U(0,0,0) a; }\n");
    let main = write(
        &dir,
        "main.qasm",
        "OPENQASM 2.0;\ninclude \"lib.inc\";\nqreg q[3];\ng q;\n",
    );

    let mut compiler = QasmCompiler::from_file(&main).unwrap();
    let mut first = Gates::default();
    compiler.run(&mut first).unwrap();
    compiler.rewind();
    let mut second = Gates::default();
    compiler.run(&mut second).unwrap();
    assert_eq!(first.count, 3);
    assert_eq!(second.count, 3);
}
