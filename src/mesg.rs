//! Byte-exact message transfer over the nonblocking control connection.
//! Each call moves exactly `len` bytes or fails; progress is bounded by the
//! negotiated timeout rather than per-call blocking.

use std::io::Error;
use std::os::unix::io::RawFd;

use log::{debug, error};

use crate::net::{self, Dir};
use crate::{timing, Ctx};

pub fn send_mesg(ctx: &Ctx, buf: &[u8], item: &str) -> Result<(), &'static str> {
    debug!("sending {}", item);
    transfer(Dir::Send, item, ctx.remote_fd, buf.len(), ctx.req.timeout, ctx.is_client(), |off| unsafe {
        libc::write(
            ctx.remote_fd,
            buf[off..].as_ptr() as *const libc::c_void,
            buf.len() - off,
        )
    })
}

pub fn recv_mesg(ctx: &Ctx, buf: &mut [u8], item: &str) -> Result<(), &'static str> {
    debug!("waiting for {}", item);
    let fd = ctx.remote_fd;
    let len = buf.len();
    transfer(Dir::Recv, item, fd, len, ctx.req.timeout, ctx.is_client(), |off| unsafe {
        libc::read(fd, buf[off..].as_mut_ptr() as *mut libc::c_void, len - off)
    })
}

/// Drive one direction of the transfer until `len` bytes have moved or the
/// deadline passes. `io` performs a single read or write at the given
/// offset and reports the syscall result.
fn transfer(
    dir: Dir,
    item: &str,
    fd: RawFd,
    len: usize,
    timeout: u32,
    is_client: bool,
    mut io: impl FnMut(usize) -> isize,
) -> Result<(), &'static str> {
    let action = match dir {
        Dir::Send => "send",
        Dir::Recv => "receive",
    };
    let deadline = timing::get_seconds() + timeout as f64;
    let mut off = 0;

    while off < len {
        let remaining = deadline - timing::get_seconds();
        if remaining <= 0.0 {
            error!("failed to {} {}: timed out", action, item);
            return Err("timed out");
        }
        match net::wait_fd(fd, dir, remaining) {
            n if n < 0 => {
                let err = Error::last_os_error();
                if err.raw_os_error() == Some(libc::EINTR) {
                    continue;
                }
                error!("failed to {} {}: select failed: {}", action, item, err);
                return Err("select failed");
            }
            0 => continue,
            _ => {}
        }

        let n = io(off);
        if n < 0 {
            let err = Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) | Some(libc::EAGAIN) => continue,
                _ => {
                    error!("failed to {} {}: {}", action, item, err);
                    return Err("transfer failed");
                }
            }
        }
        if n == 0 {
            let side = if is_client { "server" } else { "client" };
            error!("failed to {} {}: {} not responding", action, item, side);
            return Err("peer not responding");
        }
        off += n as usize;
    }
    Ok(())
}
