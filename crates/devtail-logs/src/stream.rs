//! Streaming session wiring a parser and filter to a log source
//!
//! One session per logging process: chunks are read in arrival order, parsed
//! and filtered synchronously, and accepted entries are pushed over an
//! unbounded channel. A per-chunk parse failure is reported and the stream
//! keeps going; a fatal source condition or EOF ends the session, and the
//! session kills the child process on its way out.
//!
//! Chunks are decoded lossily with no carry-over, so a read boundary that
//! lands inside a multi-byte character yields replacement characters, just
//! as it splits a logical record that straddles two reads.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use devtail_types::{Entry, Platform};

use crate::error::{ParseError, StreamError};
use crate::filter::EntryFilter;
use crate::parser::EntryParser;

const CHUNK_CAPACITY: usize = 8 * 1024;

/// Event pushed to the session consumer.
#[derive(Debug)]
pub enum StreamEvent<P> {
    /// An entry the filter accepted.
    Entry(Entry<P>),

    /// A stream-level error; the session terminates afterwards only if
    /// [`StreamError::is_fatal`] holds.
    Error(StreamError),

    /// The session is done: source EOF, fatal error, or cancellation.
    /// Always the final event.
    Terminated,
}

/// A parser/filter pair over one platform. Owning the filter here keeps a
/// mismatched pairing (logcat parser, simulator filter) from compiling.
pub struct Pipeline<Pa, F> {
    parser: Pa,
    filter: F,
}

impl<Pa, F> Pipeline<Pa, F>
where
    Pa: EntryParser,
    F: EntryFilter<Priority = Pa::Priority>,
{
    pub fn new(parser: Pa, filter: F) -> Self {
        Self { parser, filter }
    }

    pub fn platform(&self) -> Platform {
        self.parser.platform()
    }

    /// Parse one chunk and keep the entries the filter accepts.
    pub fn process_chunk(&self, raw: &str) -> Result<Vec<Entry<Pa::Priority>>, ParseError> {
        let entries = self.parser.parse_chunk(raw)?;
        Ok(entries
            .into_iter()
            .filter(|entry| self.filter.should_include(entry))
            .collect())
    }
}

/// Handle for a running log session.
pub struct LogSession {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl LogSession {
    /// Attach to a spawned logging process. Takes ownership of the child so
    /// it can be killed when the session ends.
    pub fn attach<Pa, F>(
        mut child: Child,
        pipeline: Pipeline<Pa, F>,
        tx: mpsc::UnboundedSender<StreamEvent<Pa::Priority>>,
    ) -> Result<Self, StreamError>
    where
        Pa: EntryParser + Send + 'static,
        F: EntryFilter<Priority = Pa::Priority> + Send + 'static,
    {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| StreamError::Source("child stdout is not piped".to_string()))?;
        let stderr = child.stderr.take();

        let cancel = CancellationToken::new();
        let task = tokio::spawn(pump(
            stdout,
            stderr,
            Some(child),
            pipeline,
            tx,
            cancel.clone(),
        ));

        Ok(Self {
            cancel,
            task: Some(task),
        })
    }

    /// Attach to raw readers instead of a child process. Used by tests and
    /// by callers that manage the process themselves.
    pub fn from_readers<R, E, Pa, F>(
        stdout: R,
        stderr: Option<E>,
        pipeline: Pipeline<Pa, F>,
        tx: mpsc::UnboundedSender<StreamEvent<Pa::Priority>>,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
        Pa: EntryParser + Send + 'static,
        F: EntryFilter<Priority = Pa::Priority> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(pump(stdout, stderr, None, pipeline, tx, cancel.clone()));
        Self {
            cancel,
            task: Some(task),
        }
    }

    /// Request cooperative shutdown. The task emits `Terminated` and kills
    /// the child before exiting.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether the session is still streaming.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Wait for the session task to finish.
    pub async fn wait(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for LogSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Read stderr if present; pend forever otherwise so the select arm is inert.
async fn read_stderr<E: AsyncRead + Unpin>(
    stderr: &mut Option<E>,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    match stderr {
        Some(reader) => reader.read(buf).await,
        None => std::future::pending().await,
    }
}

async fn pump<R, E, Pa, F>(
    mut stdout: R,
    mut stderr: Option<E>,
    mut child: Option<Child>,
    pipeline: Pipeline<Pa, F>,
    tx: mpsc::UnboundedSender<StreamEvent<Pa::Priority>>,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
    Pa: EntryParser,
    F: EntryFilter<Priority = Pa::Priority>,
{
    let platform = pipeline.platform();
    let mut out_buf = vec![0u8; CHUNK_CAPACITY];
    let mut err_buf = vec![0u8; CHUNK_CAPACITY];

    'stream: loop {
        tokio::select! {
            _ = cancel.cancelled() => break 'stream,

            read = stdout.read(&mut out_buf) => match read {
                Ok(0) => break 'stream,
                Ok(n) => {
                    let chunk = String::from_utf8_lossy(&out_buf[..n]);
                    match pipeline.process_chunk(&chunk) {
                        Ok(entries) => {
                            for entry in entries {
                                if tx.send(StreamEvent::Entry(entry)).is_err() {
                                    // Consumer is gone; stop streaming.
                                    break 'stream;
                                }
                            }
                        }
                        Err(err) => {
                            tracing::debug!(%err, "recoverable chunk parse failure");
                            let _ = tx.send(StreamEvent::Error(err.into()));
                        }
                    }
                }
                Err(err) => {
                    let _ = tx.send(StreamEvent::Error(StreamError::Source(err.to_string())));
                    break 'stream;
                }
            },

            read = read_stderr(&mut stderr, &mut err_buf) => match read {
                Ok(0) | Err(_) => {
                    // Stderr closed; stdout may still be live.
                    stderr = None;
                }
                Ok(n) => {
                    let text = String::from_utf8_lossy(&err_buf[..n]).trim().to_string();
                    let fatal = platform
                        .fatal_stderr_marker()
                        .is_some_and(|marker| text.contains(marker));
                    if fatal {
                        let _ = tx.send(StreamEvent::Error(StreamError::SourceFatal(text)));
                        break 'stream;
                    }
                    tracing::warn!(%text, "log source stderr");
                    let _ = tx.send(StreamEvent::Error(StreamError::Source(text)));
                }
            },
        }
    }

    if let Some(child) = child.as_mut() {
        if let Err(err) = child.kill().await {
            tracing::debug!(%err, "failed to kill logging process");
        }
    }
    let _ = tx.send(StreamEvent::Terminated);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AndroidFilter, IosFilter};
    use crate::parser::{AndroidParser, IosParser};
    use devtail_types::{AndroidPriority, IosPriority};
    use tokio::io::AsyncWriteExt;

    fn android_pipeline(filter: AndroidFilter) -> Pipeline<AndroidParser, AndroidFilter> {
        Pipeline::new(AndroidParser::new(), filter)
    }

    #[test]
    fn test_process_chunk_filters_entries() {
        let pipeline = android_pipeline(AndroidFilter::by_tag(
            AndroidPriority::Verbose,
            vec!["storaged".to_string()],
        ));
        let chunk = "\
04-08 00:58:53.967 E/storaged(  934): getDiskStats failed
04-08 01:32:25.371 W/wificond(  935): No pno scan started";
        let accepted = pipeline.process_chunk(chunk).expect("parses");
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].tag.as_deref(), Some("storaged"));
    }

    #[test]
    fn test_process_chunk_empty_is_error() {
        let pipeline = android_pipeline(AndroidFilter::all(AndroidPriority::Unknown));
        assert!(pipeline.process_chunk("").is_err());
    }

    #[tokio::test]
    async fn test_session_streams_entries_then_terminates() {
        let (mut stdout_w, stdout_r) = tokio::io::duplex(1024);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let pipeline = android_pipeline(AndroidFilter::all(AndroidPriority::Info));
        let mut session = LogSession::from_readers(
            stdout_r,
            None::<tokio::io::Empty>,
            pipeline,
            tx,
        );

        stdout_w
            .write_all(b"04-08 00:58:53.967 E/storaged(  934): getDiskStats failed\n")
            .await
            .expect("write");
        stdout_w
            .write_all(b"04-08 01:10:54.990 V/chatty  ( 1383): below threshold\n")
            .await
            .expect("write");
        drop(stdout_w);

        let mut entries = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Entry(entry) => entries.push(entry),
                StreamEvent::Error(err) => panic!("unexpected error: {err}"),
                StreamEvent::Terminated => break,
            }
        }
        session.wait().await;

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tag.as_deref(), Some("storaged"));
        assert!(!session.is_running());
    }

    #[tokio::test]
    async fn test_garbage_chunk_does_not_stop_stream() {
        let (mut stdout_w, stdout_r) = tokio::io::duplex(1024);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let pipeline = android_pipeline(AndroidFilter::all(AndroidPriority::Unknown));
        let _session = LogSession::from_readers(
            stdout_r,
            None::<tokio::io::Empty>,
            pipeline,
            tx,
        );

        stdout_w
            .write_all(b"--------- beginning of main\n")
            .await
            .expect("write");
        stdout_w
            .write_all(b"04-08 00:58:53.967 E/storaged(  934): still alive\n")
            .await
            .expect("write");
        drop(stdout_w);

        let mut entries = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Entry(entry) => entries.push(entry),
                StreamEvent::Error(err) => assert!(!err.is_fatal()),
                StreamEvent::Terminated => break,
            }
        }
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].messages, vec!["still alive"]);
    }

    #[tokio::test]
    async fn test_fatal_stderr_marker_terminates_ios_session() {
        let (stdout_w, stdout_r) = tokio::io::duplex(1024);
        let (mut stderr_w, stderr_r) = tokio::io::duplex(1024);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let pipeline = Pipeline::new(IosParser::new(), IosFilter::all(IosPriority::Debug));
        let _session = LogSession::from_readers(stdout_r, Some(stderr_r), pipeline, tx);

        stderr_w
            .write_all(b"No devices are booted.\n")
            .await
            .expect("write");

        let mut saw_fatal = false;
        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Error(err) if err.is_fatal() => saw_fatal = true,
                StreamEvent::Terminated => break,
                _ => {}
            }
        }
        assert!(saw_fatal);

        // Keep the writers alive until the session has terminated so the
        // test exercises the fatal path rather than EOF.
        drop(stdout_w);
        drop(stderr_w);
    }

    #[tokio::test]
    async fn test_nonfatal_stderr_keeps_streaming() {
        let (mut stdout_w, stdout_r) = tokio::io::duplex(1024);
        let (mut stderr_w, stderr_r) = tokio::io::duplex(1024);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let pipeline = android_pipeline(AndroidFilter::all(AndroidPriority::Unknown));
        let _session = LogSession::from_readers(stdout_r, Some(stderr_r), pipeline, tx);

        stderr_w.write_all(b"some warning\n").await.expect("write");
        stdout_w
            .write_all(b"04-08 00:58:53.967 E/storaged(  934): after stderr\n")
            .await
            .expect("write");
        drop(stderr_w);
        drop(stdout_w);

        let mut entries = Vec::new();
        let mut errors = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Entry(entry) => entries.push(entry),
                StreamEvent::Error(err) => errors.push(err),
                StreamEvent::Terminated => break,
            }
        }
        assert_eq!(entries.len(), 1);
        assert!(errors.iter().all(|e| !e.is_fatal()));
    }

    #[tokio::test]
    async fn test_stop_terminates_session() {
        let (_stdout_w, stdout_r) = tokio::io::duplex(1024);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let pipeline = android_pipeline(AndroidFilter::all(AndroidPriority::Unknown));
        let mut session = LogSession::from_readers(
            stdout_r,
            None::<tokio::io::Empty>,
            pipeline,
            tx,
        );

        session.stop();
        session.wait().await;
        assert!(!session.is_running());

        let mut saw_terminated = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, StreamEvent::Terminated) {
                saw_terminated = true;
            }
        }
        assert!(saw_terminated);
    }
}
