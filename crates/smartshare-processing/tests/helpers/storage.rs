use async_trait::async_trait;
use smartshare_core::{PublishRecord, StorageBackend, TargetRef};
use smartshare_storage::{
    EntryWriter, ListScope, NewEntry, SharedStorage, StorageError, StorageResult, StoredEntry,
};
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use tokio::io::AsyncWrite;
use tokio::sync::Notify;

/// Which storage calls should fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    pub fail_create: bool,
    /// Fail the writer once this many bytes have been accepted.
    pub fail_write_after: Option<usize>,
    pub fail_finalize: bool,
    pub panic_finalize: bool,
    pub fail_delete: bool,
}

/// Wraps a real backend and injects failures into selected calls.
pub struct FaultyStorage {
    inner: Arc<dyn SharedStorage>,
    faults: Faults,
    gate: Option<(Arc<Gate>, usize)>,
    deletes: AtomicUsize,
}

impl FaultyStorage {
    pub fn new(inner: Arc<dyn SharedStorage>, faults: Faults) -> Self {
        Self {
            inner,
            faults,
            gate: None,
            deletes: AtomicUsize::new(0),
        }
    }

    /// Hold every writer at `gate` once `pass` bytes have been written.
    pub fn with_gate(mut self, gate: Arc<Gate>, pass: usize) -> Self {
        self.gate = Some((gate, pass));
        self
    }

    /// How many times `delete_entry` was called.
    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SharedStorage for FaultyStorage {
    async fn create_entry(&self, entry: &NewEntry) -> StorageResult<PublishRecord> {
        if self.faults.fail_create {
            return Err(StorageError::CreateFailed("injected create fault".to_string()));
        }
        self.inner.create_entry(entry).await
    }

    async fn open_writer(&self, record: &PublishRecord) -> StorageResult<EntryWriter> {
        let mut writer = self.inner.open_writer(record).await?;
        if let Some((gate, pass)) = &self.gate {
            writer = Box::pin(GatedWriter {
                inner: writer,
                gate: gate.clone(),
                pass: *pass,
            });
        }
        match self.faults.fail_write_after {
            Some(limit) => Ok(Box::pin(FailingWriter {
                inner: writer,
                remaining: limit,
            })),
            None => Ok(writer),
        }
    }

    async fn finalize(&self, record: &mut PublishRecord) -> StorageResult<TargetRef> {
        if self.faults.panic_finalize {
            panic!("injected finalize panic");
        }
        if self.faults.fail_finalize {
            return Err(StorageError::FinalizeFailed(
                "injected finalize fault".to_string(),
            ));
        }
        self.inner.finalize(record).await
    }

    async fn delete_entry(&self, record: &PublishRecord) -> StorageResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.faults.fail_delete {
            return Err(StorageError::DeleteFailed("injected delete fault".to_string()));
        }
        self.inner.delete_entry(record).await
    }

    async fn list_entries(&self, scope: ListScope) -> StorageResult<Vec<StoredEntry>> {
        self.inner.list_entries(scope).await
    }

    async fn grant_read(&self, target: &TargetRef) -> StorageResult<()> {
        self.inner.grant_read(target).await
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }

    fn supports_pending(&self) -> bool {
        self.inner.supports_pending()
    }

    fn root(&self) -> &Path {
        self.inner.root()
    }
}

/// Writer that accepts `remaining` bytes, then fails every write.
struct FailingWriter {
    inner: EntryWriter,
    remaining: usize,
}

impl AsyncWrite for FailingWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        if this.remaining == 0 {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::Other,
                "injected write fault",
            )));
        }
        let n = buf.len().min(this.remaining);
        match this.inner.as_mut().poll_write(cx, &buf[..n]) {
            Poll::Ready(Ok(written)) => {
                this.remaining -= written;
                Poll::Ready(Ok(written))
            }
            other => other,
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.inner.as_mut().poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.inner.as_mut().poll_shutdown(cx)
    }
}

/// Holds writers mid-transfer until released.
#[derive(Default)]
pub struct Gate {
    open: AtomicBool,
    waker: Mutex<Option<Waker>>,
    reached: Notify,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Resolves once a writer is held at the gate.
    pub async fn reached(&self) {
        self.reached.notified().await
    }

    pub fn release(&self) {
        self.open.store(true, Ordering::SeqCst);
        if let Some(waker) = self.waker.lock().expect("gate lock").take() {
            waker.wake();
        }
    }
}

/// Writer that lets `pass` bytes through, then waits for its gate to open.
struct GatedWriter {
    inner: EntryWriter,
    gate: Arc<Gate>,
    pass: usize,
}

impl AsyncWrite for GatedWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        if this.pass == 0 && !this.gate.open.load(Ordering::SeqCst) {
            *this.gate.waker.lock().expect("gate lock") = Some(cx.waker().clone());
            this.gate.reached.notify_one();
            if !this.gate.open.load(Ordering::SeqCst) {
                return Poll::Pending;
            }
        }
        let n = if this.pass > 0 {
            buf.len().min(this.pass)
        } else {
            buf.len()
        };
        match this.inner.as_mut().poll_write(cx, &buf[..n]) {
            Poll::Ready(Ok(written)) => {
                this.pass = this.pass.saturating_sub(written);
                Poll::Ready(Ok(written))
            }
            other => other,
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.inner.as_mut().poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.inner.as_mut().poll_shutdown(cx)
    }
}
