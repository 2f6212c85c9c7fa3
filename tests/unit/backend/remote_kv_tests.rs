use basicdb::backend::remote_kv::local::LocalKvStore;
use basicdb::backend::remote_kv::RemoteKvBackend;

use super::suite;

#[test]
fn satisfies_the_shared_backend_invariants() {
    let backend = RemoteKvBackend::new(LocalKvStore::new());
    suite::run_all(&backend, "remote_kv");
}
