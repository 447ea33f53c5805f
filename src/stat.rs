//! Statistics kept by each side of a test and the math that turns them into
//! results. Counters travel over the wire as a [`Stat`] snapshot; after the
//! exchange each side holds the combined view and derives rates, bandwidths,
//! costs and CPU utilization from the tick deltas.

use crate::params::Req;
use crate::Ctx;

/// One cumulative tick counter column.
pub type Clock = u64;

/// Columns of the tick vectors. REAL comes from the process clock; the rest
/// from the "cpu " line of /proc/stat, in kernel order.
pub const T_N: usize = 9;
pub const T_REAL: usize = 0;
pub const T_USER: usize = 1;
pub const T_NICE: usize = 2;
pub const T_KERNEL: usize = 3;
pub const T_IDLE: usize = 4;
pub const T_IOWAIT: usize = 5;
pub const T_IRQ: usize = 6;
pub const T_SOFTIRQ: usize = 7;
pub const T_STEAL: usize = 8;

/// Unidirectional transfer counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ustat {
    pub no_bytes: u64,
    pub no_msgs: u64,
    pub no_errs: u64,
}

/// Full statistics snapshot of one side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stat {
    pub no_cpus: u32,
    /// Ticks per second of the clocks below.
    pub no_ticks: u32,
    /// Largest completion queue depth seen; only verbs tests fill this in.
    pub max_cqes: u32,
    pub time_s: [Clock; T_N],
    pub time_e: [Clock; T_N],
    /// What this side sent.
    pub s: Ustat,
    /// What this side received.
    pub r: Ustat,
    /// What the peer reported it sent.
    pub rem_s: Ustat,
    /// What the peer reported it received.
    pub rem_r: Ustat,
}

/// Derived per-side results. Times are seconds; cpu_* are fractions of the
/// elapsed real time.
#[derive(Clone, Copy, Debug, Default)]
pub struct Resn {
    pub time_real: f64,
    pub time_cpu: f64,
    pub cpu_user: f64,
    pub cpu_intr: f64,
    pub cpu_idle: f64,
    pub cpu_kernel: f64,
    pub cpu_io_wait: f64,
    pub cpu_total: f64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Res {
    pub l: Resn,
    pub r: Resn,
    pub latency: f64,
    pub msg_rate: f64,
    pub send_bw: f64,
    pub recv_bw: f64,
    pub send_cost: f64,
    pub recv_cost: f64,
}

fn add_ustat(l: &mut Ustat, r: &Ustat) {
    l.no_bytes += r.no_bytes;
    l.no_msgs += r.no_msgs;
    l.no_errs += r.no_errs;
}

/// Combine the counters the remote node kept track of with the local ones,
/// on both snapshots.
pub fn cross_add(lstat: &mut Stat, rstat: &mut Stat) {
    add_ustat(&mut lstat.s, &rstat.rem_s);
    add_ustat(&mut lstat.r, &rstat.rem_r);
    add_ustat(&mut rstat.s, &lstat.rem_s);
    add_ustat(&mut rstat.r, &lstat.rem_r);
}

/// Calculate time values for one node.
fn calc_node(stat: &Stat) -> Resn {
    let mut resn = Resn::default();
    let s = (stat.time_e[T_REAL].wrapping_sub(stat.time_s[T_REAL])) as f64;
    if s == 0.0 || stat.no_ticks == 0 {
        return resn;
    }
    let ticks = stat.no_ticks as f64;
    let delta = |i: usize| (stat.time_e[i].wrapping_sub(stat.time_s[i])) as f64;

    resn.time_real = s / ticks;

    let mut cpu = 0.0;
    for i in 0..T_N {
        if i != T_REAL && i != T_IDLE {
            cpu += delta(i);
        }
    }
    resn.time_cpu = cpu / ticks;

    resn.cpu_user = (delta(T_USER) + delta(T_NICE)) / s;
    resn.cpu_intr = (delta(T_IRQ) + delta(T_SOFTIRQ)) / s;
    resn.cpu_idle = delta(T_IDLE) / s;
    resn.cpu_kernel = (delta(T_KERNEL) + delta(T_STEAL)) / s;
    resn.cpu_io_wait = delta(T_IOWAIT) / s;
    resn.cpu_total = resn.cpu_user + resn.cpu_intr + resn.cpu_kernel + resn.cpu_io_wait;
    resn
}

/// Derive the cross-node results from two combined snapshots.
pub fn derive(lstat: &Stat, rstat: &Stat) -> Res {
    let mut res = Res::default();
    res.l = calc_node(lstat);
    res.r = calc_node(rstat);

    let no_msgs = (lstat.r.no_msgs + rstat.r.no_msgs) as f64;
    if no_msgs != 0.0 {
        res.latency = res.l.time_real / no_msgs;
    }

    let loc_time = res.l.time_real;
    let rem_time = res.r.time_real;
    let mid_time = (loc_time + rem_time) / 2.0;
    if loc_time == 0.0 || rem_time == 0.0 {
        return res;
    }

    res.msg_rate = if rstat.r.no_msgs == 0 {
        lstat.r.no_msgs as f64 / rem_time
    } else if lstat.r.no_msgs == 0 {
        rstat.r.no_msgs as f64 / loc_time
    } else {
        (lstat.r.no_msgs + rstat.r.no_msgs) as f64 / mid_time
    };

    res.send_bw = if rstat.s.no_bytes == 0 {
        lstat.s.no_bytes as f64 / loc_time
    } else if lstat.s.no_bytes == 0 {
        rstat.s.no_bytes as f64 / rem_time
    } else {
        (lstat.s.no_bytes + rstat.s.no_bytes) as f64 / mid_time
    };

    res.recv_bw = if rstat.r.no_bytes == 0 {
        lstat.r.no_bytes as f64 / loc_time
    } else if lstat.r.no_bytes == 0 {
        rstat.r.no_bytes as f64 / rem_time
    } else {
        (lstat.r.no_bytes + rstat.r.no_bytes) as f64 / mid_time
    };

    // Costs only make sense when the traffic is unambiguously one-way.
    let gb = 1e9;
    if lstat.s.no_bytes != 0 && lstat.r.no_bytes == 0 && rstat.s.no_bytes == 0 {
        res.send_cost = res.l.time_cpu * gb / lstat.s.no_bytes as f64;
    } else if rstat.s.no_bytes != 0 && rstat.r.no_bytes == 0 && lstat.s.no_bytes == 0 {
        res.send_cost = res.r.time_cpu * gb / rstat.s.no_bytes as f64;
    }
    if rstat.r.no_bytes != 0 && rstat.s.no_bytes == 0 && lstat.r.no_bytes == 0 {
        res.recv_cost = res.r.time_cpu * gb / rstat.r.no_bytes as f64;
    } else if lstat.r.no_bytes != 0 && lstat.s.no_bytes == 0 && rstat.r.no_bytes == 0 {
        res.recv_cost = res.l.time_cpu * gb / lstat.r.no_bytes as f64;
    }
    res
}

pub fn calc_results(ctx: &mut Ctx) {
    if !ctx.successful {
        return;
    }
    let mut lstat = ctx.lstat;
    let mut rstat = ctx.rstat;
    cross_add(&mut lstat, &mut rstat);
    ctx.lstat = lstat;
    ctx.rstat = rstat;
    ctx.res = derive(&ctx.lstat, &ctx.rstat);
}

/// Determine how many of `room` messages may still be sent when `no_msgs`
/// bounds the test; unlimited tests always get the full room.
pub fn left_to_send(req: &Req, sent: u64, room: u32) -> u32 {
    if req.no_msgs == 0 {
        return room;
    }
    let left = (req.no_msgs as u64).saturating_sub(sent);
    left.min(room as u64) as u32
}

/// Read every received byte so the transfer cost includes touching the data.
pub fn touch_data(buf: &[u8]) {
    let mut sum = 0u64;
    for &b in buf {
        sum = sum.wrapping_add(b as u64);
    }
    std::hint::black_box(sum);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_add_combines_peer_counters() {
        let mut l = Stat::default();
        let mut r = Stat::default();
        l.s = Ustat { no_bytes: 1000, no_msgs: 10, no_errs: 0 };
        r.rem_s = Ustat { no_bytes: 1000, no_msgs: 10, no_errs: 0 };
        cross_add(&mut l, &mut r);
        assert_eq!(l.s, Ustat { no_bytes: 2000, no_msgs: 20, no_errs: 0 });
        assert_eq!(l.r, Ustat::default());
        assert_eq!(r.s, Ustat::default());
    }

    fn ticked(real: u64, user: u64, kernel: u64, idle: u64) -> Stat {
        let mut stat = Stat::default();
        stat.no_ticks = 100;
        stat.time_s = [1000; T_N];
        stat.time_e = [1000; T_N];
        stat.time_e[T_REAL] += real;
        stat.time_e[T_USER] += user;
        stat.time_e[T_KERNEL] += kernel;
        stat.time_e[T_IDLE] += idle;
        stat
    }

    #[test]
    fn node_times_follow_tick_deltas() {
        let stat = ticked(200, 50, 30, 120);
        let resn = calc_node(&stat);
        assert!((resn.time_real - 2.0).abs() < 1e-12);
        assert!((resn.time_cpu - 0.8).abs() < 1e-12);
        assert!((resn.cpu_user - 0.25).abs() < 1e-12);
        assert!((resn.cpu_kernel - 0.15).abs() < 1e-12);
        assert!((resn.cpu_idle - 0.6).abs() < 1e-12);
        assert!((resn.cpu_total - 0.4).abs() < 1e-12);
    }

    #[test]
    fn zero_real_delta_yields_zero_results() {
        let mut stat = ticked(0, 50, 30, 120);
        stat.time_e[T_REAL] = stat.time_s[T_REAL];
        let resn = calc_node(&stat);
        assert_eq!(resn.time_real, 0.0);
        assert_eq!(resn.cpu_total, 0.0);
    }

    #[test]
    fn one_sided_bandwidth_uses_the_counting_side() {
        let mut l = ticked(200, 0, 0, 0);
        let mut r = ticked(200, 0, 0, 0);
        l.s.no_bytes = 1_000_000;
        l.s.no_msgs = 100;
        r.r.no_bytes = 1_000_000;
        r.r.no_msgs = 100;
        let res = derive(&l, &r);
        // Local sent 1 MB over 2 s and nothing was recorded remotely.
        assert!((res.send_bw - 500_000.0).abs() < 1e-6);
        assert!((res.recv_bw - 500_000.0).abs() < 1e-6);
        assert!((res.msg_rate - 50.0).abs() < 1e-6);
    }

    #[test]
    fn latency_divides_by_total_received() {
        let mut l = ticked(100, 0, 0, 0);
        let mut r = ticked(100, 0, 0, 0);
        l.r.no_msgs = 500;
        r.r.no_msgs = 500;
        let res = derive(&l, &r);
        assert!((res.latency - 0.001).abs() < 1e-12);
    }

    #[test]
    fn cost_requires_one_way_traffic() {
        let mut l = ticked(100, 50, 0, 0);
        let mut r = ticked(100, 0, 0, 0);
        l.s.no_bytes = 1_000_000_000;
        r.r.no_bytes = 1_000_000_000;
        let res = derive(&l, &r);
        assert!(res.send_cost > 0.0);
        assert!(res.recv_cost == 0.0);

        // Bidirectional traffic has no well-defined per-byte cost.
        let mut l2 = l;
        l2.r.no_bytes = 5;
        let res = derive(&l2, &r);
        assert_eq!(res.send_cost, 0.0);
    }

    #[test]
    fn left_to_send_honors_the_message_budget() {
        let mut req = Req::default();
        assert_eq!(left_to_send(&req, 0, 8), 8);
        req.no_msgs = 10;
        assert_eq!(left_to_send(&req, 0, 8), 8);
        assert_eq!(left_to_send(&req, 7, 8), 3);
        assert_eq!(left_to_send(&req, 10, 8), 0);
        assert_eq!(left_to_send(&req, 12, 8), 0);
    }
}
