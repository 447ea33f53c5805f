//! Control protocol. The server accepts one connection per test, validates
//! the request and forks a worker for it; the client connects, sends the
//! request and drives the test body. Both sides meet in the middle through
//! the sync exchange and trade statistics afterwards.

use log::{debug, error};

use crate::net::{self, Socket};
use crate::params::{ParIndex, Req};
use crate::tests::TESTS;
use crate::{error_die, mesg, syserror_die, timing, wire};
use crate::{Ctx, LISTENQ, SYNC_MESG, VER_INC, VER_MAJ, VER_MIN};

/// Serve forever: accept, validate, fork a worker per test.
pub fn server(ctx: &mut Ctx) -> ! {
    server_listen(ctx);
    loop {
        debug!("waiting for request");
        ctx.req.timeout = ctx.server_timeout;
        if !server_recv_request(ctx) {
            continue;
        }
        if ctx.req.ver_maj != VER_MAJ || ctx.req.ver_min != VER_MIN {
            // The socket stays open so the lower-versioned client notices
            // by timing out rather than by a confusing empty read.
            error!("{}", upgrade_message(&ctx.req));
            continue;
        }
        if ctx.req.req_index as usize >= TESTS.len() {
            error!("server: bad request index: {}", ctx.req.req_index);
            continue;
        }
        let test = &TESTS[ctx.req.req_index as usize];
        ctx.test_name = test.name;
        debug!("request is {}", test.name);

        let pid = unsafe { libc::fork() };
        if pid == 0 {
            ctx.lstat = ctx.istat;
            timing::clear_finished();
            ctx.successful = false;
            set_affinity(&ctx.req);
            let _ = (test.server)(ctx);
            timing::stop_timing(&mut ctx.lstat);
            std::process::exit(0);
        } else if pid < 0 {
            error!("fork failed: {}", std::io::Error::last_os_error());
        } else {
            unsafe { libc::waitpid(pid, std::ptr::null_mut(), 0) };
        }
        net::close_fd(ctx.remote_fd);
        ctx.remote_fd = -1;
    }
}

/// Tell the operator which side is behind. The lower side is picked by
/// lexicographic (major, minor) comparison; a tie blames the client.
/// Incremental differences are tolerated before this is called.
fn upgrade_message(req: &Req) -> String {
    let client = (req.ver_maj, req.ver_min, req.ver_inc);
    let server = (VER_MAJ, VER_MIN, VER_INC);
    let (low, from, to) = if (client.0, client.1) > (server.0, server.1) {
        ("server", server, client)
    } else {
        ("client", client, server)
    };
    format!(
        "upgrade {} from {}.{}.{} to {}.{}.{}",
        low, from.0, from.1, from.2, to.0, to.1, to.2
    )
}

fn server_listen(ctx: &mut Ctx) {
    let addrs = net::resolve(None, ctx.listen_port, libc::SOCK_STREAM, true);
    let mut bound = None;
    for addr in &addrs {
        if let Ok(sock) = Socket::create(addr) {
            if sock.set_reuseaddr().is_err() {
                syserror_die!("setsockopt failed");
            }
            if sock.bind(addr).is_ok() {
                bound = Some(sock);
                break;
            }
            sock.close();
        }
    }
    let Some(sock) = bound else {
        error_die!("Unable to bind to listen port");
    };
    if sock.listen(LISTENQ).is_err() {
        syserror_die!("listen failed");
    }
    ctx.listen_fd = sock.fd;
}

fn server_recv_request(ctx: &mut Ctx) -> bool {
    let listener = Socket::from_fd(ctx.listen_fd);
    let sock = match listener.accept() {
        Ok(sock) => sock,
        Err(_) => return false,
    };
    ctx.remote_fd = sock.fd;
    if sock.set_nonblocking().is_err() {
        net::close_fd(ctx.remote_fd);
        ctx.remote_fd = -1;
        return false;
    }
    let mut buf = [0u8; wire::REQ_SIZE];
    if mesg::recv_mesg(ctx, &mut buf, "request data").is_err() {
        net::close_fd(ctx.remote_fd);
        ctx.remote_fd = -1;
        return false;
    }
    ctx.req = wire::decode_req(&buf);
    true
}

/// Run one client-side test against the server named on the command line.
pub fn client(ctx: &mut Ctx, index: usize) {
    let test = &TESTS[index];

    ctx.par.clear_inuse();
    if !ctx.par_isset(ParIndex::LocNoMsgs) {
        ctx.setp_u32(None, ParIndex::LocTime, 2);
    }
    if !ctx.par_isset(ParIndex::RemNoMsgs) {
        ctx.setp_u32(None, ParIndex::RemTime, 2);
    }
    ctx.setp_u32(None, ParIndex::LocTimeout, 5);
    ctx.setp_u32(None, ParIndex::RemTimeout, 5);
    ctx.par_use(ParIndex::LocAffinity);
    ctx.par_use(ParIndex::RemAffinity);
    ctx.par_use(ParIndex::LocTime);
    ctx.par_use(ParIndex::RemTime);

    set_affinity(&ctx.req);
    ctx.rreq.ver_maj = VER_MAJ;
    ctx.rreq.ver_min = VER_MIN;
    ctx.rreq.ver_inc = VER_INC;
    ctx.rreq.req_index = index as u16;
    ctx.test_name = test.name;
    debug!("sending request {}", test.name);
    ctx.lstat = ctx.istat;
    println!("{}:", test.name);
    timing::clear_finished();
    ctx.successful = false;

    let _ = (test.client)(ctx);

    net::close_fd(ctx.remote_fd);
    ctx.remote_fd = -1;
    if !ctx.successful {
        ctx.exit_status = 1;
    }
    ctx.view.place_show();
}

/// Connect to the server, retrying for `--wait` seconds if asked to, and
/// send the encoded request. Connection failures here are fatal.
pub fn client_send_request(ctx: &mut Ctx) -> Result<(), &'static str> {
    let host = ctx.server_name.clone().unwrap_or_default();
    let addrs = net::resolve(Some(&host), ctx.listen_port, libc::SOCK_STREAM, false);

    let mut fd = -1;
    if ctx.wait != 0 {
        timing::start_timing(&mut ctx.lstat, ctx.wait);
    }
    loop {
        for addr in &addrs {
            if let Ok(sock) = Socket::create(addr) {
                if sock.connect(addr).is_ok() {
                    fd = sock.fd;
                    break;
                }
                sock.close();
            }
        }
        if fd >= 0 || ctx.wait == 0 || timing::finished() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_secs(1));
    }
    if ctx.wait != 0 {
        timing::stop_timing(&mut ctx.lstat);
        // Re-open the latch so the retry alarm cannot cut the test short.
        timing::clear_finished();
    }
    if fd < 0 {
        error_die!("Failed to connect");
    }
    ctx.remote_fd = fd;
    if Socket::from_fd(fd).set_nonblocking().is_err() {
        std::process::exit(1);
    }

    let mut buf = [0u8; wire::REQ_SIZE];
    wire::encode_req(&ctx.rreq, &mut buf);
    if mesg::send_mesg(ctx, &buf, "request data").is_err() {
        std::process::exit(1);
    }
    Ok(())
}

pub fn set_affinity(req: &Req) {
    let a = req.affinity;
    if a == 0 {
        return;
    }
    if !core_affinity::set_for_current(core_affinity::CoreId { id: (a - 1) as usize }) {
        error_die!("Cannot set processor affinity (cpu {})", a - 1);
    }
}

/// Meet the peer at the starting line, then start the clock. The client
/// sends first; the server answers once it is ready.
pub fn synchronize(ctx: &mut Ctx) -> Result<(), &'static str> {
    if ctx.is_client() {
        send_sync(ctx)?;
        recv_sync(ctx)?;
    } else {
        recv_sync(ctx)?;
        send_sync(ctx)?;
    }
    debug!("sync completed");
    timing::start_timing(&mut ctx.lstat, ctx.req.time);
    Ok(())
}

fn send_sync(ctx: &Ctx) -> Result<(), &'static str> {
    mesg::send_mesg(ctx, SYNC_MESG, "sync")
}

fn recv_sync(ctx: &Ctx) -> Result<(), &'static str> {
    let mut data = [0u8; SYNC_MESG.len()];
    mesg::recv_mesg(ctx, &mut data, "sync")?;
    if data != *SYNC_MESG {
        error!("sync failure: data does not match");
        return Err("sync mismatch");
    }
    Ok(())
}

/// Trade statistics after a test. The trailing sync ensures the client is
/// out of its loop before the server tears its side down. `successful`
/// survives only if every step completed.
pub fn exchange_results(ctx: &mut Ctx) {
    if !ctx.successful {
        return;
    }
    ctx.successful = false;
    if ctx.is_client() {
        let mut buf = [0u8; wire::STAT_SIZE];
        if mesg::recv_mesg(ctx, &mut buf, "results").is_err() {
            return;
        }
        ctx.rstat = wire::decode_stat(&buf);
        if send_sync(ctx).is_err() {
            return;
        }
    } else {
        let mut buf = [0u8; wire::STAT_SIZE];
        wire::encode_stat(&ctx.lstat, &mut buf);
        if mesg::send_mesg(ctx, &buf, "results").is_err() {
            return;
        }
        if recv_sync(ctx).is_err() {
            return;
        }
    }
    ctx.successful = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upgrade_message_blames_the_lower_side() {
        let old = Req {
            ver_maj: 0,
            ver_min: 1,
            ver_inc: 0,
            ..Req::default()
        };
        assert_eq!(upgrade_message(&old), "upgrade client from 0.1.0 to 0.2.0");

        let new = Req {
            ver_maj: 0,
            ver_min: 3,
            ver_inc: 1,
            ..Req::default()
        };
        assert_eq!(upgrade_message(&new), "upgrade server from 0.2.0 to 0.3.1");
    }

    #[test]
    fn same_version_ties_blame_the_client() {
        // Callers only ask once (maj, min) differ, but an incremental-only
        // difference must still word the message from the client's side.
        let req = Req {
            ver_maj: VER_MAJ,
            ver_min: VER_MIN,
            ver_inc: 9,
            ..Req::default()
        };
        assert_eq!(upgrade_message(&req), "upgrade client from 0.2.9 to 0.2.0");
    }
}
