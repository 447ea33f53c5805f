//! Result rendering. Values are queued as they are produced, each gated by
//! a verbosity tag and scaled through an engineering unit ladder, then the
//! whole queue is printed as one aligned table per test. `--unify_units`
//! switches to raw, separator-free numbers for machine consumption.

use crate::params::{par_type, ParType, ParValue, PAR_NAMES};
use crate::stat::{T_IDLE, T_IOWAIT, T_IRQ, T_KERNEL, T_N, T_NICE, T_REAL, T_SOFTIRQ, T_STEAL, T_USER};
use crate::{bug_die, stat, Ctx};

/// What a test measured, selecting the headline rows.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Latency,
    MsgRate,
    Bandwidth,
    BandwidthSr,
}

struct Show {
    pref: &'static str,
    name: &'static str,
    unit: Option<&'static str>,
    data: String,
    altn: Option<String>,
}

pub struct View {
    pub debug: bool,
    pub unify_units: bool,
    pub unify_nodes: bool,
    pub precision: usize,
    pub verbose_conf: u8,
    pub verbose_stat: u8,
    pub verbose_time: u8,
    pub verbose_used: u8,
    queue: Vec<Show>,
}

impl View {
    pub fn new() -> View {
        View {
            debug: false,
            unify_units: false,
            unify_nodes: false,
            precision: 3,
            verbose_conf: 0,
            verbose_stat: 0,
            verbose_time: 0,
            verbose_used: 0,
            queue: Vec::new(),
        }
    }

    pub fn set_verbose_all(&mut self, level: u8) {
        self.verbose_conf = level;
        self.verbose_stat = level;
        self.verbose_time = level;
        self.verbose_used = level;
    }

    /// Determine if we are verbose enough to show a value. Type 'a' always
    /// shows; everything else also requires a positive value.
    fn verbose(&self, tag: char, value: f64) -> bool {
        if tag == 'a' {
            return true;
        }
        if value <= 0.0 {
            return false;
        }
        match tag {
            'd' => self.debug,
            'c' => self.verbose_conf >= 1,
            's' => self.verbose_stat >= 1,
            't' => self.verbose_time >= 1,
            'u' => self.verbose_used >= 1,
            'C' => self.verbose_conf >= 2,
            'S' => self.verbose_stat >= 2,
            'T' => self.verbose_time >= 2,
            'U' => self.verbose_used >= 2,
            _ => bug_die!("verbose: bad type: {}", tag),
        }
    }

    pub fn view_time(&mut self, tag: char, pref: &'static str, name: &'static str, value: f64) {
        static TAB: [&str; 4] = ["ns", "us", "ms", "sec"];
        let mut value = value * 1e9;
        if !self.verbose(tag, value) {
            return;
        }
        let mut n = 0;
        if !self.unify_units {
            while value >= 1000.0 && n < TAB.len() - 1 {
                value /= 1000.0;
                n += 1;
            }
        }
        self.place_val(pref, name, TAB[n], value);
    }

    pub fn view_band(&mut self, tag: char, pref: &'static str, name: &'static str, value: f64) {
        static TAB: [&str; 5] = ["bytes/sec", "KB/sec", "MB/sec", "GB/sec", "TB/sec"];
        if !self.verbose(tag, value) {
            return;
        }
        let mut value = value;
        let mut n = 0;
        if !self.unify_units {
            while value >= 1000.0 && n < TAB.len() - 1 {
                value /= 1000.0;
                n += 1;
            }
        }
        self.place_val(pref, name, TAB[n], value);
    }

    pub fn view_rate(&mut self, tag: char, pref: &'static str, name: &'static str, value: f64) {
        static TAB: [&str; 5] = ["/sec", "K/sec", "M/sec", "G/sec", "T/sec"];
        if !self.verbose(tag, value) {
            return;
        }
        let mut value = value;
        let mut n = 0;
        if !self.unify_units {
            while value >= 1000.0 && n < TAB.len() - 1 {
                value /= 1000.0;
                n += 1;
            }
        }
        self.place_val(pref, name, TAB[n], value);
    }

    pub fn view_cost(&mut self, tag: char, pref: &'static str, name: &'static str, value: f64) {
        static TAB: [&str; 4] = ["ns/GB", "us/GB", "ms/GB", "sec/GB"];
        let mut value = value * 1e9;
        if !self.verbose(tag, value) {
            return;
        }
        let mut n = 0;
        if !self.unify_units {
            while value >= 1000.0 && n < TAB.len() - 1 {
                value /= 1000.0;
                n += 1;
            }
        }
        self.place_val(pref, name, TAB[n], value);
    }

    pub fn view_cpus(&mut self, tag: char, pref: &'static str, name: &'static str, value: f64) {
        let value = value * 100.0;
        if !self.verbose(tag, value) {
            return;
        }
        self.place_val(pref, name, "% cpus", value);
    }

    pub fn view_long(&mut self, tag: char, pref: &'static str, name: &'static str, value: u64) {
        static TAB: [&str; 5] = ["", "thousand", "million", "billion", "trillion"];
        let mut val = value as f64;
        if !self.verbose(tag, val) {
            return;
        }
        let mut n = 0;
        if !self.unify_units && val >= 1e6 {
            while val >= 1000.0 && n < TAB.len() - 1 {
                val /= 1000.0;
                n += 1;
            }
        }
        self.place_val(pref, name, TAB[n], val);
    }

    pub fn view_size(&mut self, tag: char, pref: &'static str, name: &'static str, value: u64) {
        static TAB: [&str; 5] = ["bytes", "KB", "MB", "GB", "TB"];
        let mut val = value as f64;
        if !self.verbose(tag, val) {
            return;
        }
        let mut n = 0;
        if !self.unify_units {
            if self.nice_1024(pref, name, value) {
                return;
            }
            while val >= 1000.0 && n < TAB.len() - 1 {
                val /= 1000.0;
                n += 1;
            }
        }
        self.place_val(pref, name, TAB[n], val);
    }

    pub fn view_strn(&mut self, tag: char, pref: &'static str, name: &'static str, value: &str) {
        if !self.verbose(tag, if value.is_empty() { 0.0 } else { 1.0 }) {
            return;
        }
        self.place_any(pref, name, None, value.to_string(), None);
    }

    /// Render a value as a clean multiple of a power of 1024 if it is one,
    /// keeping the exact count as the alternate.
    fn nice_1024(&mut self, pref: &'static str, name: &'static str, value: u64) -> bool {
        static TAB: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
        if value < 1024 || value % 1024 != 0 {
            return false;
        }
        let mut val = value / 1024;
        let mut n = 0;
        while val >= 1024 && n < TAB.len() - 1 {
            if val % 1024 != 0 {
                return false;
            }
            val /= 1024;
            n += 1;
        }
        let data = self.commify(val.to_string());
        let altn = self.commify(value.to_string());
        self.place_any(pref, name, Some(TAB[n]), data, Some(altn));
        true
    }

    /// Format to the requested number of significant digits, dropping
    /// trailing zeros and a dangling decimal point.
    fn format_value(&self, value: f64) -> String {
        let data = format!("{:.0}", value);
        let digits = data.strip_prefix('-').unwrap_or(&data).len();
        if digits >= self.precision {
            return data;
        }
        let mut s = format!("{:.*}", self.precision - digits, value);
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        s
    }

    /// Insert commas into the integer portion of a rendered number.
    /// Suppressed entirely in unified-units mode so output stays parseable.
    fn commify(&self, data: String) -> String {
        if self.unify_units {
            return data;
        }
        let b = data.as_bytes();
        let mut end = b.len();
        let mut i = b.len();
        while i > 0 && b[i - 1].is_ascii_digit() {
            i -= 1;
        }
        if i > 0 && b[i - 1] == b'.' {
            end = i - 1;
            i -= 1;
            while i > 0 && b[i - 1].is_ascii_digit() {
                i -= 1;
            }
        }
        let start = i;
        let run = end - start;
        if run <= 3 {
            return data;
        }

        let mut out = String::with_capacity(data.len() + run / 3);
        out.push_str(&data[..start]);
        for (k, c) in data[start..end].chars().enumerate() {
            if k > 0 && (run - k) % 3 == 0 {
                out.push(',');
            }
            out.push(c);
        }
        out.push_str(&data[end..]);
        out
    }

    fn place_val(&mut self, pref: &'static str, name: &'static str, unit: &'static str, value: f64) {
        let data = self.format_value(value);
        let data = self.commify(data);
        self.place_any(pref, name, Some(unit), data, None);
    }

    fn place_any(
        &mut self,
        pref: &'static str,
        name: &'static str,
        unit: Option<&'static str>,
        data: String,
        altn: Option<String>,
    ) {
        self.queue.push(Show { pref, name, unit, data, altn });
    }

    /// Lay out everything queued since the last call and drain the queue.
    fn render(&mut self) -> String {
        let mut name_len = 0;
        let mut data_len = 0;
        for e in &self.queue {
            name_len = name_len.max(e.pref.len() + e.name.len());
            if e.unit.is_some() {
                data_len = data_len.max(e.data.len());
            }
        }

        let mut out = String::new();
        for e in &self.queue {
            out.push_str("    ");
            out.push_str(e.pref);
            let pad = name_len - e.pref.len();
            out.push_str(&format!("{:<pad$}", e.name));
            match e.unit {
                Some(unit) => out.push_str(&format!("  =  {:>data_len$} {}", e.data, unit)),
                None => out.push_str(&format!("  =  {}", e.data)),
            }
            if let Some(altn) = &e.altn {
                out.push_str(&format!(" ({})", altn));
            }
            out.push('\n');
        }
        self.queue.clear();
        out
    }

    pub fn place_show(&mut self) {
        print!("{}", self.render());
    }
}

impl Default for View {
    fn default() -> Self {
        View::new()
    }
}

pub fn show_results(ctx: &mut Ctx, measure: Measure) {
    stat::calc_results(ctx);
    show_info(ctx, measure);
}

fn show_info(ctx: &mut Ctx, measure: Measure) {
    if !ctx.successful {
        return;
    }
    match measure {
        Measure::Latency => {
            ctx.view.view_time('a', "", "latency", ctx.res.latency);
            ctx.view.view_rate('s', "", "msg_rate", ctx.res.msg_rate);
        }
        Measure::MsgRate => {
            ctx.view.view_rate('a', "", "msg_rate", ctx.res.msg_rate);
        }
        Measure::Bandwidth => {
            ctx.view.view_band('a', "", "bw", ctx.res.recv_bw);
            ctx.view.view_rate('s', "", "msg_rate", ctx.res.msg_rate);
        }
        Measure::BandwidthSr => {
            ctx.view.view_band('a', "", "send_bw", ctx.res.send_bw);
            ctx.view.view_band('a', "", "recv_bw", ctx.res.recv_bw);
            ctx.view.view_rate('s', "", "msg_rate", ctx.res.msg_rate);
        }
    }
    show_used(ctx);
    ctx.view.view_cost('t', "", "send_cost", ctx.res.send_cost);
    ctx.view.view_cost('t', "", "recv_cost", ctx.res.recv_cost);
    show_rest(ctx);
    if ctx.view.debug {
        show_debug(ctx);
    }
}

/// Show the parameters the current test paid attention to, collapsing the
/// local/remote pair when both sides agree.
fn show_used(ctx: &mut Ctx) {
    if ctx.view.verbose_used == 0 {
        return;
    }
    for p in PAR_NAMES.iter() {
        let l = *ctx.par.meta(p.loc);
        let r = *ctx.par.meta(p.rem);
        if !l.inuse && !r.inuse {
            continue;
        }
        if ctx.view.verbose_used < 2 && !l.set && !r.set {
            continue;
        }
        match (ctx.par_value(p.loc), ctx.par_value(p.rem)) {
            (ParValue::U32(lv), ParValue::U32(rv)) => match par_type(p.loc) {
                ParType::Size => {
                    if lv == rv {
                        ctx.view.view_size('u', "", p.name, lv as u64);
                    } else {
                        ctx.view.view_size('u', "loc_", p.name, lv as u64);
                        ctx.view.view_size('u', "rem_", p.name, rv as u64);
                    }
                }
                ParType::Time => {
                    if lv == rv {
                        ctx.view.view_time('u', "", p.name, lv as f64);
                    } else {
                        ctx.view.view_time('u', "loc_", p.name, lv as f64);
                        ctx.view.view_time('u', "rem_", p.name, rv as f64);
                    }
                }
                _ => {
                    if lv == rv {
                        ctx.view.view_long('u', "", p.name, lv as u64);
                    } else {
                        ctx.view.view_long('u', "loc_", p.name, lv as u64);
                        ctx.view.view_long('u', "rem_", p.name, rv as u64);
                    }
                }
            },
            (ParValue::Str(lv), ParValue::Str(rv)) => {
                if lv == rv {
                    ctx.view.view_strn('u', "", p.name, &lv);
                } else {
                    ctx.view.view_strn('u', "loc_", p.name, &lv);
                    ctx.view.view_strn('u', "rem_", p.name, &rv);
                }
            }
            _ => bug_die!("show: mismatched parameter pair for {}", p.name),
        }
    }
}

/// Show the per-node timing and counter details. When traffic ran in
/// exactly one direction the two nodes are relabeled send/recv instead of
/// loc/rem, unless `--unify_nodes` suppressed that.
fn show_rest(ctx: &mut Ctx) {
    let ls = ctx.lstat.s.no_bytes;
    let lr = ctx.lstat.r.no_bytes;
    let rs = ctx.rstat.s.no_bytes;
    let rr = ctx.rstat.r.no_bytes;

    let srmode = if ctx.view.unify_nodes {
        None
    } else if ls != 0 && rs == 0 && rr != 0 && lr == 0 {
        Some(false)
    } else if rs != 0 && ls == 0 && lr != 0 && rr == 0 {
        Some(true)
    } else {
        None
    };

    if let Some(flipped) = srmode {
        let (resn_s, resn_r) = if flipped {
            (ctx.res.r, ctx.res.l)
        } else {
            (ctx.res.l, ctx.res.r)
        };
        let (stat_s, stat_r) = if flipped {
            (ctx.rstat, ctx.lstat)
        } else {
            (ctx.lstat, ctx.rstat)
        };

        ctx.view.view_cpus('t', "", "send_cpus_used", resn_s.cpu_total);
        ctx.view.view_cpus('T', "", "send_cpus_user", resn_s.cpu_user);
        ctx.view.view_cpus('T', "", "send_cpus_intr", resn_s.cpu_intr);
        ctx.view.view_cpus('T', "", "send_cpus_kernel", resn_s.cpu_kernel);
        ctx.view.view_cpus('T', "", "send_cpus_iowait", resn_s.cpu_io_wait);
        ctx.view.view_time('T', "", "send_real_time", resn_s.time_real);
        ctx.view.view_time('T', "", "send_cpu_time", resn_s.time_cpu);
        ctx.view.view_long('S', "", "send_errors", stat_s.s.no_errs);
        ctx.view.view_size('S', "", "send_bytes", stat_s.s.no_bytes);
        ctx.view.view_long('S', "", "send_msgs", stat_s.s.no_msgs);
        ctx.view.view_long('S', "", "send_max_cqe", stat_s.max_cqes as u64);

        ctx.view.view_cpus('t', "", "recv_cpus_used", resn_r.cpu_total);
        ctx.view.view_cpus('T', "", "recv_cpus_user", resn_r.cpu_user);
        ctx.view.view_cpus('T', "", "recv_cpus_intr", resn_r.cpu_intr);
        ctx.view.view_cpus('T', "", "recv_cpus_kernel", resn_r.cpu_kernel);
        ctx.view.view_cpus('T', "", "recv_cpus_iowait", resn_r.cpu_io_wait);
        ctx.view.view_time('T', "", "recv_real_time", resn_r.time_real);
        ctx.view.view_time('T', "", "recv_cpu_time", resn_r.time_cpu);
        ctx.view.view_long('S', "", "recv_errors", stat_r.r.no_errs);
        ctx.view.view_size('S', "", "recv_bytes", stat_r.r.no_bytes);
        ctx.view.view_long('S', "", "recv_msgs", stat_r.r.no_msgs);
        ctx.view.view_long('S', "", "recv_max_cqe", stat_r.max_cqes as u64);
    } else {
        ctx.view.view_cpus('t', "", "loc_cpus_used", ctx.res.l.cpu_total);
        ctx.view.view_cpus('T', "", "loc_cpus_user", ctx.res.l.cpu_user);
        ctx.view.view_cpus('T', "", "loc_cpus_intr", ctx.res.l.cpu_intr);
        ctx.view.view_cpus('T', "", "loc_cpus_kernel", ctx.res.l.cpu_kernel);
        ctx.view.view_cpus('T', "", "loc_cpus_iowait", ctx.res.l.cpu_io_wait);
        ctx.view.view_time('T', "", "loc_real_time", ctx.res.l.time_real);
        ctx.view.view_time('T', "", "loc_cpu_time", ctx.res.l.time_cpu);
        ctx.view.view_long('S', "", "loc_send_errors", ctx.lstat.s.no_errs);
        ctx.view.view_long('S', "", "loc_recv_errors", ctx.lstat.r.no_errs);
        ctx.view.view_size('S', "", "loc_send_bytes", ctx.lstat.s.no_bytes);
        ctx.view.view_size('S', "", "loc_recv_bytes", ctx.lstat.r.no_bytes);
        ctx.view.view_long('S', "", "loc_send_msgs", ctx.lstat.s.no_msgs);
        ctx.view.view_long('S', "", "loc_recv_msgs", ctx.lstat.r.no_msgs);
        ctx.view.view_long('S', "", "loc_max_cqe", ctx.lstat.max_cqes as u64);

        ctx.view.view_cpus('t', "", "rem_cpus_used", ctx.res.r.cpu_total);
        ctx.view.view_cpus('T', "", "rem_cpus_user", ctx.res.r.cpu_user);
        ctx.view.view_cpus('T', "", "rem_cpus_intr", ctx.res.r.cpu_intr);
        ctx.view.view_cpus('T', "", "rem_cpus_kernel", ctx.res.r.cpu_kernel);
        ctx.view.view_cpus('T', "", "rem_cpus_iowait", ctx.res.r.cpu_io_wait);
        ctx.view.view_time('T', "", "rem_real_time", ctx.res.r.time_real);
        ctx.view.view_time('T', "", "rem_cpu_time", ctx.res.r.time_cpu);
        ctx.view.view_long('S', "", "rem_send_errors", ctx.rstat.s.no_errs);
        ctx.view.view_long('S', "", "rem_recv_errors", ctx.rstat.r.no_errs);
        ctx.view.view_size('S', "", "rem_send_bytes", ctx.rstat.s.no_bytes);
        ctx.view.view_size('S', "", "rem_recv_bytes", ctx.rstat.r.no_bytes);
        ctx.view.view_long('S', "", "rem_send_msgs", ctx.rstat.s.no_msgs);
        ctx.view.view_long('S', "", "rem_recv_msgs", ctx.rstat.r.no_msgs);
        ctx.view.view_long('S', "", "rem_max_cqe", ctx.rstat.max_cqes as u64);
    }
}

/// Raw dump of both snapshots for debugging.
fn show_debug(ctx: &mut Ctx) {
    fn node(view: &mut View, stat: &crate::stat::Stat, names: &DebugNames) {
        view.view_long('d', "", names.no_cpus, stat.no_cpus as u64);
        view.view_long('d', "", names.no_ticks, stat.no_ticks as u64);
        view.view_long('d', "", names.max_cqes, stat.max_cqes as u64);

        if stat.no_ticks != 0 {
            let t = stat.no_ticks as f64;
            let delta = |i: usize| (stat.time_e[i].wrapping_sub(stat.time_s[i])) as f64 / t;
            view.view_time('d', "", names.timer[0], delta(T_REAL));
            view.view_time('d', "", names.timer[1], delta(T_USER));
            view.view_time('d', "", names.timer[2], delta(T_NICE));
            view.view_time('d', "", names.timer[3], delta(T_KERNEL));
            view.view_time('d', "", names.timer[4], delta(T_IDLE));
            view.view_time('d', "", names.timer[5], delta(T_IOWAIT));
            view.view_time('d', "", names.timer[6], delta(T_IRQ));
            view.view_time('d', "", names.timer[7], delta(T_SOFTIRQ));
            view.view_time('d', "", names.timer[8], delta(T_STEAL));
        }

        for (ustat, cols) in [
            (&stat.s, &names.s),
            (&stat.r, &names.r),
            (&stat.rem_s, &names.rem_s),
            (&stat.rem_r, &names.rem_r),
        ] {
            view.view_size('d', "", cols[0], ustat.no_bytes);
            view.view_long('d', "", cols[1], ustat.no_msgs);
            view.view_long('d', "", cols[2], ustat.no_errs);
        }
    }

    struct DebugNames {
        no_cpus: &'static str,
        no_ticks: &'static str,
        max_cqes: &'static str,
        timer: [&'static str; T_N],
        s: [&'static str; 3],
        r: [&'static str; 3],
        rem_s: [&'static str; 3],
        rem_r: [&'static str; 3],
    }

    static LOCAL: DebugNames = DebugNames {
        no_cpus: "l_no_cpus",
        no_ticks: "l_no_ticks",
        max_cqes: "l_max_cqes",
        timer: [
            "l_timer_real", "l_timer_user", "l_timer_nice", "l_timer_system", "l_timer_idle",
            "l_timer_iowait", "l_timer_irq", "l_timer_softirq", "l_timer_steal",
        ],
        s: ["l_s_no_bytes", "l_s_no_msgs", "l_s_no_errs"],
        r: ["l_r_no_bytes", "l_r_no_msgs", "l_r_no_errs"],
        rem_s: ["l_rem_s_no_bytes", "l_rem_s_no_msgs", "l_rem_s_no_errs"],
        rem_r: ["l_rem_r_no_bytes", "l_rem_r_no_msgs", "l_rem_r_no_errs"],
    };

    static REMOTE: DebugNames = DebugNames {
        no_cpus: "r_no_cpus",
        no_ticks: "r_no_ticks",
        max_cqes: "r_max_cqes",
        timer: [
            "r_timer_real", "r_timer_user", "r_timer_nice", "r_timer_system", "r_timer_idle",
            "r_timer_iowait", "r_timer_irq", "r_timer_softirq", "r_timer_steal",
        ],
        s: ["r_s_no_bytes", "r_s_no_msgs", "r_s_no_errs"],
        r: ["r_r_no_bytes", "r_r_no_msgs", "r_r_no_errs"],
        rem_s: ["r_rem_s_no_bytes", "r_rem_s_no_msgs", "r_rem_s_no_errs"],
        rem_r: ["r_rem_r_no_bytes", "r_rem_r_no_msgs", "r_rem_r_no_errs"],
    };

    let lstat = ctx.lstat;
    let rstat = ctx.rstat;
    node(&mut ctx.view, &lstat, &LOCAL);
    node(&mut ctx.view, &rstat, &REMOTE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_prefers_powers_of_1024() {
        let mut view = View::new();
        view.view_size('a', "", "x", 1048576);
        assert_eq!(view.render(), "    x  =  1 MiB (1,048,576)\n");
    }

    #[test]
    fn unified_units_disable_ladders_and_commas() {
        let mut view = View::new();
        view.unify_units = true;
        view.view_size('a', "", "x", 1048576);
        assert_eq!(view.render(), "    x  =  1048576 bytes\n");
    }

    #[test]
    fn nice_1024_picks_the_matching_unit() {
        let mut view = View::new();
        assert!(!view.nice_1024("", "x", 1000));
        assert!(!view.nice_1024("", "x", 1023));
        assert!(view.nice_1024("", "x", 1024));
        assert_eq!(view.render(), "    x  =  1 KiB (1,024)\n");
        assert!(view.nice_1024("", "x", 1024 * 1024 * 1024));
        assert_eq!(view.render(), "    x  =  1 GiB (1,073,741,824)\n");
        // Above 1 MiB every intermediate step must divide cleanly too.
        assert!(!view.nice_1024("", "x", 1536 * 1024));
        assert!(view.nice_1024("", "x", 1023 * 1024));
        assert_eq!(view.render(), "    x  =  1,023 KiB (1,047,552)\n");
    }

    #[test]
    fn values_render_with_three_significant_digits() {
        let mut view = View::new();
        view.view_band('a', "", "bw", 123_456_789.0);
        assert_eq!(view.render(), "    bw  =  123 MB/sec\n");
        view.view_band('a', "", "bw", 1_234.0);
        assert_eq!(view.render(), "    bw  =  1.23 KB/sec\n");
        view.view_time('a', "", "latency", 0.000_033_333);
        assert_eq!(view.render(), "    latency  =  33.3 us\n");
    }

    #[test]
    fn commify_groups_only_the_integer_part() {
        let view = View::new();
        assert_eq!(view.commify("1234567.89".to_string()), "1,234,567.89");
        assert_eq!(view.commify("1234".to_string()), "1,234");
        assert_eq!(view.commify("123".to_string()), "123");
        assert_eq!(view.commify("0.1234".to_string()), "0.1234");
    }

    #[test]
    fn verbosity_gates_suppress_rows() {
        let mut view = View::new();
        view.view_rate('s', "", "msg_rate", 100.0);
        assert_eq!(view.render(), "");
        view.verbose_stat = 1;
        view.view_rate('s', "", "msg_rate", 100.0);
        assert_eq!(view.render(), "    msg_rate  =  100 /sec\n");
        // Level 1 does not unlock level 2 rows.
        view.view_long('S', "", "loc_send_msgs", 5);
        assert_eq!(view.render(), "");
        // Non-positive values only show for the always tag.
        view.view_rate('s', "", "msg_rate", 0.0);
        assert_eq!(view.render(), "");
    }

    #[test]
    fn rows_align_on_the_widest_entry() {
        let mut view = View::new();
        view.view_time('a', "", "latency", 0.000_05);
        view.view_rate('a', "", "msg_rate", 20_000.0);
        view.view_strn('a', "", "loc_node", "apollo");
        let out = view.render();
        assert_eq!(
            out,
            "    latency   =  50 us\n    msg_rate  =  20 K/sec\n    loc_node  =  apollo\n"
        );
    }

    #[test]
    fn ladders_stop_at_the_last_unit() {
        let mut view = View::new();
        view.view_cost('a', "", "send_cost", 5_000_000.0);
        assert_eq!(view.render(), "    send_cost  =  5,000,000 sec/GB\n");
    }
}
