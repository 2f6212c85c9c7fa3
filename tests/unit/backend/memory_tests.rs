use basicdb::backend::memory::MemoryBackend;

use super::suite;

#[test]
fn satisfies_the_shared_backend_invariants() {
    let backend = MemoryBackend::new();
    suite::run_all(&backend, "memory");
}
