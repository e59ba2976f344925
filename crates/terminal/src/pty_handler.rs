//! PTY process management.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use collections::FxHashMap;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};

use crate::host::{ProcessHandle, ProcessSpawner, SpawnRequest};

/// One shell running in a pseudo-terminal.
///
/// Output is read on a background thread and buffered in a channel until
/// [`PtyHandler::read_output`] drains it. Dropping the handler kills and reaps
/// the child.
pub struct PtyHandler {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    output_rx: Receiver<Vec<u8>>,
    exited: Arc<AtomicBool>,
    child: Box<dyn Child + Send + Sync>,
    _reader_thread: thread::JoinHandle<()>,
}

impl PtyHandler {
    /// Spawn `shell` in `directory` with a `cols`x`rows` terminal.
    pub fn spawn(shell: &str, directory: &Path, rows: u16, cols: u16) -> Result<Self> {
        anyhow::ensure!(
            directory.is_dir(),
            "Directory does not exist: {}",
            directory.display()
        );

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("Failed to open PTY")?;

        let mut cmd = CommandBuilder::new(shell);
        cmd.cwd(directory);
        cmd.env("TERM", "xterm-256color");

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("Failed to spawn shell {}", shell))?;
        // The reader only sees EOF once no slave handle is left open here.
        drop(pair.slave);
        let master = pair.master;

        let writer = master
            .take_writer()
            .context("Failed to get PTY writer")?;

        let mut reader = master
            .try_clone_reader()
            .context("Failed to get PTY reader")?;

        let (output_tx, output_rx): (Sender<Vec<u8>>, Receiver<Vec<u8>>) = mpsc::channel();
        let exited = Arc::new(AtomicBool::new(false));
        let exited_clone = exited.clone();

        let reader_thread = thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        // EOF
                        exited_clone.store(true, Ordering::SeqCst);
                        break;
                    }
                    Ok(n) => {
                        if output_tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        exited_clone.store(true, Ordering::SeqCst);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            master,
            writer,
            output_rx,
            exited,
            child,
            _reader_thread: reader_thread,
        })
    }

    /// Write input bytes to the PTY
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read any pending output from the PTY (non-blocking)
    pub fn read_output(&self) -> Vec<Vec<u8>> {
        let mut output = Vec::new();
        while let Ok(data) = self.output_rx.try_recv() {
            output.push(data);
        }
        output
    }

    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    pub fn process_id(&self) -> Option<u32> {
        self.child.process_id()
    }

    pub fn resize(&self, rows: u16, cols: u16) -> Result<()> {
        self.master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("Failed to resize PTY")?;
        Ok(())
    }
}

impl Drop for PtyHandler {
    fn drop(&mut self) {
        self.exited.store(true, Ordering::SeqCst);

        // ESRCH is expected if the shell already exited
        if let Err(e) = self.child.kill() {
            tracing::debug!("Kill child process: {}", e);
        }
        if let Err(e) = self.child.wait() {
            tracing::debug!("Wait for child process: {}", e);
        }

        tracing::debug!("PTY handler dropped, child process cleaned up");
    }
}

/// [`ProcessSpawner`] backed by real PTYs.
///
/// Exited shells are reported once by [`ProcessSpawner::poll_exited`] and
/// dropped at that point. Output they left unread is kept for the next
/// [`PtyProcesses::drain_output`].
#[derive(Default)]
pub struct PtyProcesses {
    handlers: FxHashMap<ProcessHandle, PtyHandler>,
    unread: Vec<(ProcessHandle, Vec<u8>)>,
    next_handle: u64,
}

impl PtyProcesses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending output of every shell, including shells that exited since
    /// the last drain.
    pub fn drain_output(&mut self) -> Vec<(ProcessHandle, Vec<u8>)> {
        let mut output = std::mem::take(&mut self.unread);
        output.extend(
            self.handlers
                .iter()
                .map(|(handle, pty)| (*handle, pty.read_output().concat()))
                .filter(|(_, bytes)| !bytes.is_empty()),
        );
        output.sort_by_key(|(handle, _)| *handle);
        output
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    fn handler(&mut self, process: ProcessHandle) -> Result<&mut PtyHandler> {
        self.handlers
            .get_mut(&process)
            .with_context(|| format!("No such process: {}", process))
    }
}

impl ProcessSpawner for PtyProcesses {
    fn spawn(&mut self, request: SpawnRequest) -> Result<ProcessHandle> {
        let pty = PtyHandler::spawn(&request.shell, &request.directory, request.rows, request.cols)?;
        self.next_handle += 1;
        let handle = ProcessHandle(self.next_handle);
        tracing::debug!(
            %handle,
            pid = ?pty.process_id(),
            shell = %request.shell,
            buffer = %request.buffer,
            "Spawned PTY"
        );
        self.handlers.insert(handle, pty);
        Ok(handle)
    }

    fn write(&mut self, process: ProcessHandle, data: &str) -> Result<()> {
        self.handler(process)?.write(data.as_bytes())
    }

    fn is_alive(&self, process: ProcessHandle) -> bool {
        self.handlers
            .get(&process)
            .is_some_and(|pty| !pty.has_exited())
    }

    fn resize(&mut self, process: ProcessHandle, cols: u16, rows: u16) -> Result<()> {
        self.handler(process)?.resize(rows, cols)
    }

    fn kill(&mut self, process: ProcessHandle) {
        if self.handlers.remove(&process).is_some() {
            tracing::debug!(%process, "Killed PTY");
        }
    }

    fn poll_exited(&mut self) -> Vec<ProcessHandle> {
        let mut exited: Vec<ProcessHandle> = self
            .handlers
            .iter()
            .filter(|(_, pty)| pty.has_exited())
            .map(|(handle, _)| *handle)
            .collect();
        exited.sort();
        for handle in &exited {
            let Some(pty) = self.handlers.remove(handle) else {
                continue;
            };
            let bytes = pty.read_output().concat();
            if !bytes.is_empty() {
                self.unread.push((*handle, bytes));
            }
        }
        exited
    }
}
