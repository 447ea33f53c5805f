pub mod command;
pub mod ctl;
pub mod mesg;
pub mod net;
pub mod params;
pub mod show;
pub mod stat;
pub mod tests;
pub mod timing;
pub mod wire;

use std::os::unix::io::RawFd;

use params::{ParTable, Req};
use show::View;
use stat::{Res, Stat};

/// Increment VER_MIN and reset VER_INC whenever the wire layout of [`Req`]
/// changes; otherwise just bump VER_INC. VER_MAJ is reserved for major
/// changes. Peers with differing (maj, min) refuse to talk to each other.
pub const VER_MAJ: u16 = 0;
pub const VER_MIN: u16 = 2;
pub const VER_INC: u16 = 0;

/// Fixed size of the `id` request field and of the configuration strings.
pub const STRSIZE: usize = 32;
/// Scratch size for /proc reads.
pub const BUFSIZE: usize = 1024;
/// Listen queue depth of the control socket.
pub const LISTENQ: i32 = 5;
/// Synchronize message, sent with its terminating NUL.
pub const SYNC_MESG: &[u8; 4] = b"SyN\0";

pub const DEFAULT_LISTEN_PORT: u16 = 19765;
pub const DEFAULT_SERVER_TIMEOUT: u32 = 5;

/// Everything a single qperf process needs to run one test at a time. The
/// only state living outside of this is the SIGALRM channel in [`timing`].
pub struct Ctx {
    /// Parameters of this side. On the client the option layer fills it; on
    /// the server it is decoded from the wire.
    pub req: Req,
    /// Mirror of the parameters destined for the peer; the client encodes
    /// and sends it as the request.
    pub rreq: Req,
    pub par: ParTable,
    /// Per-host constants sampled once at startup; `lstat` is reset from
    /// this at the start of every test.
    pub istat: Stat,
    pub lstat: Stat,
    pub rstat: Stat,
    pub res: Res,
    pub view: View,
    pub listen_port: u16,
    pub server_timeout: u32,
    /// Seconds to keep retrying the initial connect (`--wait`); 0 disables.
    pub wait: u32,
    pub server_name: Option<String>,
    pub test_name: &'static str,
    pub listen_fd: RawFd,
    pub remote_fd: RawFd,
    pub successful: bool,
    pub exit_status: i32,
}

impl Ctx {
    pub fn new() -> Ctx {
        params::check_table_order();
        timing::init();

        let mut istat = Stat::default();
        istat.no_cpus = core_affinity::get_core_ids()
            .map(|ids| ids.len())
            .unwrap_or(0) as u32;
        istat.no_ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) } as u32;

        Ctx {
            req: Req::default(),
            rreq: Req::default(),
            par: ParTable::default(),
            istat,
            lstat: istat,
            rstat: Stat::default(),
            res: Res::default(),
            view: View::new(),
            listen_port: DEFAULT_LISTEN_PORT,
            server_timeout: DEFAULT_SERVER_TIMEOUT,
            wait: 0,
            server_name: None,
            test_name: "",
            listen_fd: -1,
            remote_fd: -1,
            successful: false,
            exit_status: 0,
        }
    }

    pub fn is_client(&self) -> bool {
        self.server_name.is_some()
    }
}

impl Default for Ctx {
    fn default() -> Self {
        Ctx::new()
    }
}

pub fn run(args: &[String]) -> i32 {
    let mut ctx = Ctx::new();
    timing::set_signals();
    command::do_args(&mut ctx, args);
    ctx.exit_status
}

/// Report a user or protocol error and exit unsuccessfully.
#[macro_export]
macro_rules! error_die {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
        std::process::exit(1)
    }};
}

/// Report a failed system call, appending the errno translation, and exit.
#[macro_export]
macro_rules! syserror_die {
    ($($arg:tt)*) => {{
        log::error!("{}: {}", format_args!($($arg)*), std::io::Error::last_os_error());
        std::process::exit(1)
    }};
}

/// Report a broken invariant and exit.
#[macro_export]
macro_rules! bug_die {
    ($($arg:tt)*) => {{
        log::error!("internal error: {}", format_args!($($arg)*));
        std::process::exit(1)
    }};
}
