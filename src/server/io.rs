// Connection IO adapter
// Stamps the no-cache headers on responses hyper writes without calling the service

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{ready, Context, Poll};

use hyper::header::HeaderMap;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::nocache::{apply_no_cache_headers, CACHE_CONTROL_VALUE};

/// Largest response head buffered before giving up on inspection.
const MAX_HEAD_SIZE: usize = 64 * 1024;
const MAX_HEADERS: usize = 64;

/// Request methods seen by the service, in order, so that the writer knows
/// which responses are answers to `HEAD` and carry no body.
#[derive(Debug, Clone, Default)]
pub struct HeadQueue(Arc<Mutex<VecDeque<bool>>>);

impl HeadQueue {
    pub fn push(&self, is_head: bool) {
        if let Ok(mut queue) = self.0.lock() {
            queue.push_back(is_head);
        }
    }

    fn pop(&self) -> bool {
        self.0
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    /// Next bytes start a response head
    Head,
    /// Body bytes still to pass through unchanged
    Body(u64),
    /// Framing unknown, everything passes through
    Passthrough,
}

/// Stream wrapper that watches the outgoing response heads.
///
/// Responses produced by the handler already carry `Cache-Control` and pass
/// through untouched. Heads without it were written by hyper itself (400 for
/// a malformed request, 431 for an oversized head, ...) and get the three
/// headers spliced in before the blank line.
#[derive(Debug)]
pub struct NoCacheIo<T> {
    inner: T,
    heads: HeadQueue,
    state: WriteState,
    head: Vec<u8>,
    pending: Vec<u8>,
    written: usize,
}

impl<T> NoCacheIo<T> {
    pub const fn new(inner: T, heads: HeadQueue) -> Self {
        Self {
            inner,
            heads,
            state: WriteState::Head,
            head: Vec::new(),
            pending: Vec::new(),
            written: 0,
        }
    }

    /// Buffer head bytes, returning how many were taken from `buf`.
    fn accept_head(&mut self, buf: &[u8]) -> usize {
        let prev_len = self.head.len();
        let search_from = prev_len.saturating_sub(3);
        self.head.extend_from_slice(buf);

        let Some(pos) = find_head_end(&self.head[search_from..]) else {
            if self.head.len() > MAX_HEAD_SIZE {
                self.pending.append(&mut self.head);
                self.state = WriteState::Passthrough;
            }
            return buf.len();
        };

        let end = search_from + pos + 4;
        self.head.truncate(end);
        let head = std::mem::take(&mut self.head);
        self.finish_head(&head);
        end - prev_len
    }

    fn finish_head(&mut self, head: &[u8]) {
        let Some(info) = inspect_head(head) else {
            self.pending.extend_from_slice(head);
            self.state = WriteState::Passthrough;
            return;
        };

        let body_len = if info.from_service {
            self.pending.extend_from_slice(head);
            if self.heads.pop() {
                0
            } else {
                info.body_len()
            }
        } else {
            splice_no_cache_headers(head, &mut self.pending);
            info.body_len()
        };

        self.state = if info.chunked {
            WriteState::Passthrough
        } else if body_len == 0 {
            WriteState::Head
        } else {
            WriteState::Body(body_len)
        };
    }
}

impl<T: AsyncWrite + Unpin> NoCacheIo<T> {
    fn poll_pending(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while self.written < self.pending.len() {
            let n = ready!(Pin::new(&mut self.inner).poll_write(cx, &self.pending[self.written..]))?;
            if n == 0 {
                return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
            }
            self.written += n;
        }
        self.pending.clear();
        self.written = 0;
        Poll::Ready(Ok(()))
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for NoCacheIo<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for NoCacheIo<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        ready!(this.poll_pending(cx))?;

        match this.state {
            WriteState::Passthrough => Pin::new(&mut this.inner).poll_write(cx, buf),
            WriteState::Body(remaining) => {
                let limit = usize::try_from(remaining).unwrap_or(usize::MAX);
                let chunk = &buf[..buf.len().min(limit)];
                let n = ready!(Pin::new(&mut this.inner).poll_write(cx, chunk))?;
                let left = remaining.saturating_sub(u64::try_from(n).unwrap_or(remaining));
                this.state = if left == 0 {
                    WriteState::Head
                } else {
                    WriteState::Body(left)
                };
                Poll::Ready(Ok(n))
            }
            WriteState::Head => {
                let taken = this.accept_head(buf);
                // Anything not written yet goes out on the next write or flush.
                if let Poll::Ready(Err(e)) = this.poll_pending(cx) {
                    return Poll::Ready(Err(e));
                }
                Poll::Ready(Ok(taken))
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_pending(cx))?;
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if !this.head.is_empty() {
            this.pending.append(&mut this.head);
        }
        ready!(this.poll_pending(cx))?;
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}

#[derive(Debug)]
struct HeadInfo {
    status: u16,
    content_length: u64,
    chunked: bool,
    from_service: bool,
}

impl HeadInfo {
    const fn body_len(&self) -> u64 {
        match self.status {
            100..=199 | 204 | 304 => 0,
            _ => self.content_length,
        }
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn inspect_head(head: &[u8]) -> Option<HeadInfo> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut response = httparse::Response::new(&mut headers);
    match response.parse(head) {
        Ok(httparse::Status::Complete(_)) => {}
        _ => return None,
    }

    let mut info = HeadInfo {
        status: response.code?,
        content_length: 0,
        chunked: false,
        from_service: false,
    };
    for header in response.headers.iter() {
        if header.name.eq_ignore_ascii_case("content-length") {
            info.content_length = std::str::from_utf8(header.value)
                .ok()?
                .trim()
                .parse()
                .ok()?;
        } else if header.name.eq_ignore_ascii_case("transfer-encoding") {
            info.chunked = true;
        } else if header.name.eq_ignore_ascii_case("cache-control") {
            info.from_service = header.value == CACHE_CONTROL_VALUE.as_bytes();
        }
    }
    Some(info)
}

/// Copy `head` into `out` with the no-cache header lines added before the
/// terminating blank line.
fn splice_no_cache_headers(head: &[u8], out: &mut Vec<u8>) {
    let mut extra = HeaderMap::new();
    apply_no_cache_headers(&mut extra);

    out.extend_from_slice(&head[..head.len() - 2]);
    for (name, value) in &extra {
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
}
