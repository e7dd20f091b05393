mod failover_test;
mod lifecycle_test;
