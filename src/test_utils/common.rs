use std::env;
use std::net::TcpListener;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Once;
use std::time::Duration;

use rand::Rng;
use tempfile::TempDir;

use crate::constants::MASTER_PORT_STRIDE;
use crate::ConfigKey;
use crate::MasterSpec;

static LOGGER_INIT: Once = Once::new();

pub fn enable_logger() {
    LOGGER_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn get_available_ports(count: usize) -> Vec<u16> {
    let mut ports = Vec::new();
    for _ in 0..count {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        ports.push(listener.local_addr().unwrap().port());
        drop(listener);
    }
    ports
}

fn is_port_free(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).is_ok()
}

/// A base port whose master ports (and web ports) for `masters` replicas are all
/// free at the time of the call.
pub fn get_available_master_base(masters: usize) -> u16 {
    let mut rng = rand::thread_rng();
    loop {
        let base: u16 = rng.gen_range(20000..49000);
        let all_free = (0..masters as u16).all(|i| {
            let port = base + i * MASTER_PORT_STRIDE;
            is_port_free(port) && is_port_free(port + 1)
        });
        if all_free {
            return base;
        }
    }
}

/// A port `p` where both `p` and `p + 1` are free.
pub fn get_available_port_pair() -> u16 {
    let mut rng = rand::thread_rng();
    loop {
        let port: u16 = rng.gen_range(50000..60000);
        if is_port_free(port) && is_port_free(port + 1) {
            return port;
        }
    }
}

/// Points `MINICLUSTER__UNDERFS__ADDRESS` at a fresh under-storage folder with its
/// `data` and `workers` sub-folders. Restores the variable on drop.
///
/// Tests using it must be `#[serial]`.
pub struct UnderfsEnv {
    dir: TempDir,
    previous: Option<String>,
}

impl UnderfsEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        std::fs::create_dir(dir.path().join("workers")).unwrap();

        let key = ConfigKey::UnderfsAddress.env_var();
        let previous = env::var(&key).ok();
        env::set_var(&key, dir.path());
        Self { dir, previous }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for UnderfsEnv {
    fn drop(&mut self) {
        let key = ConfigKey::UnderfsAddress.env_var();
        match &self.previous {
            Some(value) => env::set_var(&key, value),
            None => env::remove_var(&key),
        }
    }
}

pub fn master_spec(
    index: usize,
    port: u16,
    journal_dir: PathBuf,
) -> MasterSpec {
    MasterSpec {
        index,
        hostname: "127.0.0.1".to_string(),
        port,
        web_port: port + 1,
        coordination_address: "127.0.0.1:0".to_string(),
        journal_dir,
        block_size_bytes: 1024 * 1024,
        heartbeat_interval: Duration::from_millis(20),
    }
}
