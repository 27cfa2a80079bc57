use std::sync::Arc;

use distributed::{
    DdpStrategy, DistributedStrategy, ThreadGroup, init_process_group, is_initialized,
};

// Runs in its own test binary: the default group is process-wide.
#[test]
fn shutdown_releases_the_default_group() {
    let member = ThreadGroup::new_group(1).pop().unwrap();
    init_process_group(Arc::new(member)).unwrap();

    let strategy = DdpStrategy::new().unwrap();
    assert!(DdpStrategy::is_available());

    strategy.shutdown().unwrap();
    assert!(!is_initialized());
    assert!(!DdpStrategy::is_available());

    let gather = DdpStrategy::gather_all_tensors_fn().unwrap();
    assert!(gather(&[1.0]).is_err());

    let member = ThreadGroup::new_group(1).pop().unwrap();
    init_process_group(Arc::new(member)).unwrap();
    let restarted = DdpStrategy::new().unwrap();
    assert_eq!(restarted.size(), 1);

    // A second shutdown of the old strategy leaves the new group alone.
    strategy.shutdown().unwrap();
    assert!(DdpStrategy::is_available());
    restarted.shutdown().unwrap();
    assert!(!DdpStrategy::is_available());
}
