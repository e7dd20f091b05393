use std::sync::Arc;

use mockall::Sequence;
use tracing_test::traced_test;

use super::*;
use crate::ClientError;

fn closing_client(seq: &mut Sequence) -> Arc<dyn ClusterClient> {
    let mut client = MockClusterClient::new();
    client.expect_close().times(1).in_sequence(seq).returning(|| Ok(()));
    Arc::new(client)
}

#[test]
fn test_close_all_closes_each_client_once_in_order() {
    let registry = ClientRegistry::new();
    let mut seq = Sequence::new();
    for _ in 0..3 {
        registry.register(closing_client(&mut seq));
    }
    assert_eq!(registry.len(), 3);

    let warnings = registry.close_all();

    assert!(warnings.is_empty());
    assert!(registry.is_empty());
    // Nothing left to close a second time
    assert!(registry.close_all().is_empty());
}

#[test]
#[traced_test]
fn test_close_all_continues_past_failures() {
    let registry = ClientRegistry::new();

    let mut broken = MockClusterClient::new();
    broken
        .expect_close()
        .times(1)
        .returning(|| Err(ClientError::AlreadyClosed.into()));
    registry.register(Arc::new(broken));

    let mut healthy = MockClusterClient::new();
    healthy.expect_close().times(1).returning(|| Ok(()));
    registry.register(Arc::new(healthy));

    let warnings = registry.close_all();

    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].component, "client-0");
    assert!(logs_contain("client-0"));
}

#[test]
fn test_concurrent_registration() {
    let registry = Arc::new(ClientRegistry::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            std::thread::spawn(move || {
                let mut client = MockClusterClient::new();
                client.expect_close().times(1).returning(|| Ok(()));
                registry.register(Arc::new(client));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), 8);
    assert!(registry.close_all().is_empty());
}
