#![allow(dead_code)]

use anyhow::anyhow;
use async_trait::async_trait;
use sftp_adapter::{
    KnownHosts, MessageHandler, SftpChannel, SshSession, Transport, TransferEvent,
    TransferObserver,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Everything the stub transport was asked to do, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    LoadKnownHosts(PathBuf),
    LoadKey(PathBuf, Option<String>),
    Connect(String, Option<u16>),
    PublicKey(String, String),
    Password(String, String),
    OpenSftp,
    Put(PathBuf, String),
    CloseSftp,
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KnownHostsMode {
    /// Any path loads as an empty store
    #[default]
    Accept,
    /// Read the path for real
    FromFile,
}

/// How the stub behaves at each step
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub known_hosts: KnownHostsMode,
    pub connect_fails: bool,
    pub key_load_fails: bool,
    pub publickey_accepts: bool,
    pub publickey_errors: bool,
    pub password_accepts: bool,
    pub open_sftp_fails: bool,
    pub put_fails: bool,
    pub close_fails: bool,
    pub disconnect_fails: bool,
}

#[derive(Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<Call>>>);

impl Calls {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn all(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|c| pred(c)).count()
    }
}

pub struct StubTransport {
    pub script: Script,
    pub calls: Calls,
}

impl StubTransport {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: Calls::default(),
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    type Key = PathBuf;
    type Session = StubSession;

    fn load_known_hosts(&self, path: &Path) -> Result<KnownHosts, anyhow::Error> {
        self.calls.push(Call::LoadKnownHosts(path.to_path_buf()));
        match self.script.known_hosts {
            KnownHostsMode::Accept => Ok(KnownHosts::default()),
            KnownHostsMode::FromFile => KnownHosts::from_file(path),
        }
    }

    fn load_key(&self, path: &Path, passphrase: Option<&str>) -> Result<PathBuf, anyhow::Error> {
        self.calls
            .push(Call::LoadKey(path.to_path_buf(), passphrase.map(str::to_string)));
        if self.script.key_load_fails {
            return Err(anyhow!("invalid key format"));
        }
        Ok(path.to_path_buf())
    }

    async fn connect(
        &self,
        host: &str,
        port: Option<u16>,
        _known_hosts: KnownHosts,
    ) -> Result<StubSession, anyhow::Error> {
        self.calls.push(Call::Connect(host.to_string(), port));
        if self.script.connect_fails {
            return Err(anyhow!("Connection refused"));
        }
        Ok(StubSession {
            script: self.script.clone(),
            calls: self.calls.clone(),
        })
    }
}

pub struct StubSession {
    script: Script,
    calls: Calls,
}

#[async_trait]
impl SshSession for StubSession {
    type Key = PathBuf;
    type Sftp = StubSftp;

    async fn authenticate_publickey(
        &mut self,
        username: &str,
        key: PathBuf,
    ) -> Result<bool, anyhow::Error> {
        self.calls
            .push(Call::PublicKey(username.to_string(), key.display().to_string()));
        if self.script.publickey_errors {
            return Err(anyhow!("channel closed"));
        }
        Ok(self.script.publickey_accepts)
    }

    async fn authenticate_password(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<bool, anyhow::Error> {
        self.calls
            .push(Call::Password(username.to_string(), password.to_string()));
        Ok(self.script.password_accepts)
    }

    async fn open_sftp(&mut self) -> Result<StubSftp, anyhow::Error> {
        self.calls.push(Call::OpenSftp);
        if self.script.open_sftp_fails {
            return Err(anyhow!("subsystem request failed"));
        }
        Ok(StubSftp {
            script: self.script.clone(),
            calls: self.calls.clone(),
        })
    }

    async fn disconnect(&mut self) -> Result<(), anyhow::Error> {
        self.calls.push(Call::Disconnect);
        if self.script.disconnect_fails {
            return Err(anyhow!("broken pipe"));
        }
        Ok(())
    }
}

pub struct StubSftp {
    script: Script,
    calls: Calls,
}

#[async_trait]
impl SftpChannel for StubSftp {
    async fn put(&mut self, local: &Path, remote: &str) -> Result<u64, anyhow::Error> {
        self.calls.push(Call::Put(local.to_path_buf(), remote.to_string()));
        if self.script.put_fails {
            return Err(anyhow!("Permission denied"));
        }
        Ok(42)
    }

    async fn close(&mut self) -> Result<(), anyhow::Error> {
        self.calls.push(Call::CloseSftp);
        if self.script.close_fails {
            return Err(anyhow!("already closed"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingObserver(Mutex<Vec<TransferEvent>>);

impl RecordingObserver {
    pub fn events(&self) -> Vec<TransferEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl TransferObserver for RecordingObserver {
    fn observe(&self, event: TransferEvent) {
        self.0.lock().unwrap().push(event);
    }
}

pub struct Harness {
    pub handler: MessageHandler<StubTransport>,
    pub calls: Calls,
    pub observer: Arc<RecordingObserver>,
}

pub fn harness(script: Script) -> Harness {
    let transport = StubTransport::new(script);
    let calls = transport.calls.clone();
    let observer = Arc::new(RecordingObserver::default());
    let handler = MessageHandler::new(Arc::new(transport), observer.clone());
    Harness {
        handler,
        calls,
        observer,
    }
}
