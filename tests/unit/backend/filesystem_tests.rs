use basicdb::backend::filesystem::FilesystemBackend;

use super::suite;

#[test]
fn satisfies_the_shared_backend_invariants() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FilesystemBackend::new(dir.path()).unwrap();
    suite::run_all(&backend, "filesystem");
}
