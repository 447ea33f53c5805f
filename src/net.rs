//! Thin wrappers around the socket system calls. Everything operates on raw
//! descriptors so an accepted connection can be handed across fork and
//! closed explicitly by whichever process owns it.

use std::ffi::CString;
use std::io::Error;
use std::os::unix::io::RawFd;

use log::{debug, error};

use crate::error_die;

/// One resolved endpoint, detached from the getaddrinfo result list.
pub struct Addr {
    pub family: libc::c_int,
    pub socktype: libc::c_int,
    pub protocol: libc::c_int,
    pub addr: libc::sockaddr_storage,
    pub len: libc::socklen_t,
}

/// Resolve a host/port pair to a list of candidate endpoints. A missing
/// host with `passive` set resolves to the wildcard addresses. Resolver
/// failures are fatal.
pub fn resolve(host: Option<&str>, port: u16, socktype: libc::c_int, passive: bool) -> Vec<Addr> {
    let chost = host.map(|h| {
        CString::new(h).unwrap_or_else(|_| error_die!("{}: bad host name", h))
    });
    let service = CString::new(port.to_string()).unwrap();

    let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
    hints.ai_flags = if passive { libc::AI_PASSIVE } else { 0 };
    hints.ai_family = libc::AF_UNSPEC;
    hints.ai_socktype = socktype;

    let mut res: *mut libc::addrinfo = std::ptr::null_mut();
    let stat = unsafe {
        libc::getaddrinfo(
            chost.as_ref().map_or(std::ptr::null(), |h| h.as_ptr()),
            service.as_ptr(),
            &hints,
            &mut res,
        )
    };
    if stat != 0 {
        let msg = unsafe { std::ffi::CStr::from_ptr(libc::gai_strerror(stat)) };
        error_die!("getaddrinfo failed: {}", msg.to_string_lossy());
    }

    let mut addrs = Vec::new();
    let mut p = res;
    while !p.is_null() {
        let ai = unsafe { &*p };
        let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        unsafe {
            std::ptr::copy_nonoverlapping(
                ai.ai_addr as *const u8,
                &mut storage as *mut _ as *mut u8,
                ai.ai_addrlen as usize,
            );
        }
        addrs.push(Addr {
            family: ai.ai_family,
            socktype: ai.ai_socktype,
            protocol: ai.ai_protocol,
            addr: storage,
            len: ai.ai_addrlen,
        });
        p = ai.ai_next;
    }
    unsafe { libc::freeaddrinfo(res) };
    addrs
}

#[derive(Clone, Copy)]
pub struct Socket {
    pub fd: RawFd,
}

impl Socket {
    pub fn from_fd(fd: RawFd) -> Socket {
        Socket { fd }
    }

    pub fn create(addr: &Addr) -> Result<Socket, &'static str> {
        let fd = unsafe { libc::socket(addr.family, addr.socktype, addr.protocol) };
        if fd < 0 {
            debug!("socket failed: {}", Error::last_os_error());
            return Err("socket failed");
        }
        Ok(Socket { fd })
    }

    pub fn connect(&self, addr: &Addr) -> Result<(), &'static str> {
        let stat = unsafe {
            libc::connect(self.fd, &addr.addr as *const _ as *const libc::sockaddr, addr.len)
        };
        if stat < 0 {
            debug!("connect failed: {}", Error::last_os_error());
            return Err("connect failed");
        }
        Ok(())
    }

    pub fn bind(&self, addr: &Addr) -> Result<(), &'static str> {
        let stat = unsafe {
            libc::bind(self.fd, &addr.addr as *const _ as *const libc::sockaddr, addr.len)
        };
        if stat < 0 {
            debug!("bind failed: {}", Error::last_os_error());
            return Err("bind failed");
        }
        Ok(())
    }

    pub fn listen(&self, backlog: i32) -> Result<(), &'static str> {
        if unsafe { libc::listen(self.fd, backlog) } < 0 {
            return Err("listen failed");
        }
        Ok(())
    }

    pub fn accept(&self) -> Result<Socket, &'static str> {
        let mut addr: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
        let fd = unsafe {
            libc::accept(self.fd, &mut addr as *mut _ as *mut libc::sockaddr, &mut len)
        };
        if fd < 0 {
            error!("accept failed: {}", Error::last_os_error());
            return Err("accept failed");
        }
        Ok(Socket { fd })
    }

    pub fn set_nonblocking(&self) -> Result<(), &'static str> {
        let flags = unsafe { libc::fcntl(self.fd, libc::F_GETFL, 0) };
        if flags < 0 {
            error!("failed to get descriptor flags: {}", Error::last_os_error());
            return Err("failed to set to non-blocking");
        }
        if unsafe { libc::fcntl(self.fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
            error!("failed to set descriptor flags: {}", Error::last_os_error());
            return Err("failed to set to non-blocking");
        }
        Ok(())
    }

    pub fn set_reuseaddr(&self) -> Result<(), &'static str> {
        self.set_option(libc::SOL_SOCKET, libc::SO_REUSEADDR, 1)
    }

    /// Request both socket buffers; the kernel doubles the value to account
    /// for its own overhead.
    pub fn set_buffer_sizes(&self, size: u32) -> Result<(), &'static str> {
        self.set_option(libc::SOL_SOCKET, libc::SO_SNDBUF, size as libc::c_int)?;
        self.set_option(libc::SOL_SOCKET, libc::SO_RCVBUF, size as libc::c_int)
    }

    fn set_option(
        &self,
        level: libc::c_int,
        name: libc::c_int,
        value: libc::c_int,
    ) -> Result<(), &'static str> {
        let stat = unsafe {
            libc::setsockopt(
                self.fd,
                level,
                name,
                &value as *const _ as *const libc::c_void,
                std::mem::size_of_val(&value) as libc::socklen_t,
            )
        };
        if stat < 0 {
            error!("setsockopt failed: {}", Error::last_os_error());
            return Err("setsockopt failed");
        }
        Ok(())
    }

    /// The port this socket is bound to, for reporting an ephemeral choice
    /// to the peer.
    pub fn local_port(&self) -> Result<u16, &'static str> {
        let mut addr: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
        let stat = unsafe {
            libc::getsockname(self.fd, &mut addr as *mut _ as *mut libc::sockaddr, &mut len)
        };
        if stat < 0 {
            error!("getsockname failed: {}", Error::last_os_error());
            return Err("getsockname failed");
        }
        let port = match addr.ss_family as libc::c_int {
            libc::AF_INET => {
                let sin = unsafe { &*(&addr as *const _ as *const libc::sockaddr_in) };
                u16::from_be(sin.sin_port)
            }
            libc::AF_INET6 => {
                let sin6 = unsafe { &*(&addr as *const _ as *const libc::sockaddr_in6) };
                u16::from_be(sin6.sin6_port)
            }
            _ => return Err("unexpected socket family"),
        };
        Ok(port)
    }

    pub fn send(&self, buf: &[u8]) -> Result<usize, &'static str> {
        let n = unsafe { libc::write(self.fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
        if n < 0 {
            return Err("send failed");
        }
        Ok(n as usize)
    }

    /// A return of 0 on a stream socket means the peer closed.
    pub fn recv(&self, buf: &mut [u8]) -> Result<usize, &'static str> {
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            return Err("recv failed");
        }
        Ok(n as usize)
    }

    pub fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> Result<(usize, libc::sockaddr_storage, libc::socklen_t), &'static str> {
        let mut addr: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
        let n = unsafe {
            libc::recvfrom(
                self.fd,
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                0,
                &mut addr as *mut _ as *mut libc::sockaddr,
                &mut len,
            )
        };
        if n < 0 {
            return Err("recvfrom failed");
        }
        Ok((n as usize, addr, len))
    }

    pub fn send_to(
        &self,
        buf: &[u8],
        addr: &libc::sockaddr_storage,
        len: libc::socklen_t,
    ) -> Result<usize, &'static str> {
        let n = unsafe {
            libc::sendto(
                self.fd,
                buf.as_ptr() as *const libc::c_void,
                buf.len(),
                0,
                addr as *const _ as *const libc::sockaddr,
                len,
            )
        };
        if n < 0 {
            return Err("sendto failed");
        }
        Ok(n as usize)
    }

    pub fn close(&self) {
        unsafe { libc::close(self.fd) };
    }
}

pub fn close_fd(fd: RawFd) {
    if fd >= 0 {
        unsafe { libc::close(fd) };
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    Send,
    Recv,
}

/// Wait until the descriptor is ready for the given direction or `seconds`
/// elapse. Returns select's result: 0 on timeout, negative on error.
pub fn wait_fd(fd: RawFd, dir: Dir, seconds: f64) -> i32 {
    // Round up so a nearly expired deadline still waits a little.
    let t = seconds + 1e-6;
    let sec = t as libc::time_t;
    let mut tv = libc::timeval {
        tv_sec: sec,
        tv_usec: ((t - sec as f64) * 1e6) as libc::suseconds_t,
    };

    unsafe {
        let mut rfds: libc::fd_set = std::mem::zeroed();
        let mut wfds: libc::fd_set = std::mem::zeroed();
        libc::FD_ZERO(&mut rfds);
        libc::FD_ZERO(&mut wfds);
        match dir {
            Dir::Recv => libc::FD_SET(fd, &mut rfds),
            Dir::Send => libc::FD_SET(fd, &mut wfds),
        }
        libc::select(fd + 1, &mut rfds, &mut wfds, std::ptr::null_mut(), &mut tv)
    }
}
