//! Measurement clocks and the alarm that bounds a test. A repeating
//! interval timer raises SIGALRM when the test duration expires; the handler
//! latches the end-time snapshot and bumps the finished counter that every
//! measurement loop polls. The tiny reload period re-delivers the signal so
//! a blocking syscall entered after the finished check still gets
//! interrupted. SIGPIPE shares the handler to break out of writes to a dead
//! peer.

use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, Ordering};

use log::debug;

use crate::stat::{Clock, Stat, T_N};
use crate::{error_die, syserror_die, BUFSIZE};

/// Monotonic within one test: 0 until the alarm (or an explicit stop)
/// fires, then counts every further delivery.
static FINISHED: AtomicU32 = AtomicU32::new(0);

/// End-time snapshot, written exactly once on the 0 -> 1 transition.
static TIME_E: [AtomicU64; T_N] = [
    AtomicU64::new(0),
    AtomicU64::new(0),
    AtomicU64::new(0),
    AtomicU64::new(0),
    AtomicU64::new(0),
    AtomicU64::new(0),
    AtomicU64::new(0),
    AtomicU64::new(0),
    AtomicU64::new(0),
];

/// Kept open for the life of the process; the sampler seeks instead of
/// reopening, which also keeps the signal handler free of open().
static PROC_STAT_FD: AtomicI32 = AtomicI32::new(-1);

pub fn init() {
    let fd = unsafe { libc::open(b"/proc/stat\0".as_ptr() as *const libc::c_char, libc::O_RDONLY) };
    if fd < 0 {
        syserror_die!("Cannot open /proc/stat");
    }
    PROC_STAT_FD.store(fd, Ordering::Release);
}

/// Sample all tick columns. Column 0 is the process clock; the rest come
/// from the "cpu " line of /proc/stat. Runs in both normal and signal
/// context, so it sticks to read/lseek and hand-rolled digit parsing.
fn read_times() -> [Clock; T_N] {
    let mut timex = [0u64; T_N];

    let mut tms: libc::tms = unsafe { std::mem::zeroed() };
    timex[0] = unsafe { libc::times(&mut tms) } as u64;

    let fd = PROC_STAT_FD.load(Ordering::Acquire);
    if unsafe { libc::lseek(fd, 0, libc::SEEK_SET) } < 0 {
        syserror_die!("Failed to seek /proc/stat");
    }
    let mut buf = [0u8; BUFSIZE];
    let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, BUFSIZE - 1) };
    if n < 0 {
        syserror_die!("Failed to read /proc/stat");
    }
    let n = n as usize;
    if n < 4 || &buf[..4] != b"cpu " {
        error_die!("/proc/stat does not start with 'cpu '");
    }

    let mut p = 3;
    for slot in timex.iter_mut().skip(1) {
        while p < n && buf[p] == b' ' {
            p += 1;
        }
        if p >= n || !buf[p].is_ascii_digit() {
            if p < n && buf[p] != b'\n' {
                error_die!("/proc/stat has bad format");
            }
            break;
        }
        let mut v = 0u64;
        while p < n && buf[p].is_ascii_digit() {
            v = v * 10 + (buf[p] - b'0') as u64;
            p += 1;
        }
        *slot = v;
    }
    timex
}

pub fn get_times(out: &mut [Clock; T_N]) {
    *out = read_times();
}

/// Note that time is up. Only the first transition records the end times.
pub fn set_finished() {
    if FINISHED.fetch_add(1, Ordering::AcqRel) == 0 {
        let now = read_times();
        for (slot, v) in TIME_E.iter().zip(now.iter()) {
            slot.store(*v, Ordering::Release);
        }
    }
}

pub fn finished() -> bool {
    FINISHED.load(Ordering::Acquire) != 0
}

/// Reset the finished latch at the start of a test.
pub fn clear_finished() {
    FINISHED.store(0, Ordering::Release);
}

fn set_timer(itv: &libc::itimerval) {
    if unsafe { libc::setitimer(libc::ITIMER_REAL, itv, std::ptr::null_mut()) } < 0 {
        syserror_die!("setitimer failed");
    }
}

fn disarm_timer() {
    let itv: libc::itimerval = unsafe { std::mem::zeroed() };
    set_timer(&itv);
}

/// Take the start snapshot and, for a bounded test, arm the alarm. The
/// 1 microsecond reload keeps SIGALRM coming until the timer is disarmed.
pub fn start_timing(lstat: &mut Stat, seconds: u32) {
    get_times(&mut lstat.time_s);
    disarm_timer();
    if seconds == 0 {
        return;
    }
    debug!("starting timer");
    let mut itv: libc::itimerval = unsafe { std::mem::zeroed() };
    itv.it_value.tv_sec = seconds as libc::time_t;
    itv.it_interval.tv_usec = 1;
    set_timer(&itv);
}

/// Latch the end times (if the alarm has not already done so), copy them
/// into the local snapshot and disarm the timer.
pub fn stop_timing(lstat: &mut Stat) {
    set_finished();
    for (dst, slot) in lstat.time_e.iter_mut().zip(TIME_E.iter()) {
        *dst = slot.load(Ordering::Acquire);
    }
    disarm_timer();
    debug!("stopping timer");
}

extern "C" fn on_alarm(_signo: libc::c_int) {
    set_finished();
}

pub fn set_signals() {
    let handler: extern "C" fn(libc::c_int) = on_alarm;
    let mut sa: libc::sigaction = unsafe { std::mem::zeroed() };
    sa.sa_sigaction = handler as libc::sighandler_t;
    unsafe {
        libc::sigemptyset(&mut sa.sa_mask);
        libc::sigaction(libc::SIGALRM, &sa, std::ptr::null_mut());
        libc::sigaction(libc::SIGPIPE, &sa, std::ptr::null_mut());
    }
}

/// Wall clock in seconds as a floating point number.
pub fn get_seconds() -> f64 {
    let mut tv: libc::timeval = unsafe { std::mem::zeroed() };
    if unsafe { libc::gettimeofday(&mut tv, std::ptr::null_mut()) } < 0 {
        syserror_die!("gettimeofday failed");
    }
    tv.tv_sec as f64 + tv.tv_usec as f64 / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stat::T_REAL;

    #[test]
    fn sampled_clocks_are_monotonic() {
        init();
        let mut first = [0u64; T_N];
        let mut second = [0u64; T_N];
        get_times(&mut first);
        get_times(&mut second);
        assert!(second[T_REAL] >= first[T_REAL]);
        // The /proc/stat columns are cumulative counters.
        for i in 1..T_N {
            assert!(second[i] >= first[i]);
        }
    }

    #[test]
    fn wall_clock_advances() {
        let a = get_seconds();
        let b = get_seconds();
        assert!(b >= a);
        assert!(a > 1e9);
    }
}
