//! Racing installs of one approved package.

use forge_cli::service::Forge;
use forge_cli::test_utils::{PackageFixture, TestHome, init_test_logging};
use std::collections::HashMap;
use std::sync::Barrier;

#[test]
fn test_one_approval_admits_exactly_one_install() {
    init_test_logging(None);
    let env = TestHome::new().unwrap();
    let forge = Forge::new(env.config(), &env.home);
    let package = PackageFixture::basic("racer").write_to(&env.temp.path().join("racer.dxt")).unwrap();
    let selected = forge.select_package(&package).unwrap();
    let registry = env.registry();

    let barrier = Barrier::new(4);
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    forge.install_package(&selected, &registry, HashMap::new())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(result.as_ref().unwrap_err().is_access_denied());
    }
    assert!(forge.approvals().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reselecting_allows_another_install() {
    let env = TestHome::new().unwrap();
    let forge = Forge::new(env.config(), &env.home);
    let package = PackageFixture::basic("again").write_to(&env.temp.path().join("again.mcpb")).unwrap();
    let registry = env.registry();

    for _ in 0..2 {
        let selected = forge.select_package(&package).unwrap();
        let forge = forge.clone();
        let registry = registry.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            forge.install_package(&selected, &registry, HashMap::new())
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(outcome.server_name, "again");
    }

    let installs = forge
        .activity_entries()
        .iter()
        .filter(|e| e.action == forge_cli::activity::ActivityAction::Install)
        .count();
    assert_eq!(installs, 2);
}
