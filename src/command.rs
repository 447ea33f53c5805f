//! Command line handling. Options live in a flat table mapping each
//! spelling to either a parameter write (usually one per side) or a
//! miscellaneous action. The first bare word names the server, the rest
//! name tests to run against it; with no client-only input the process
//! becomes the server.

use crate::params::ParIndex;
use crate::tests::find_test;
use crate::{ctl, error_die, Ctx, VER_INC, VER_MAJ, VER_MIN};

#[derive(Clone, Copy)]
enum Action {
    Long(ParIndex, ParIndex),
    Size(ParIndex, ParIndex),
    Time(ParIndex, ParIndex),
    Strn(ParIndex, ParIndex),
    Misc(Misc),
    Help,
    Version,
}

#[derive(Clone, Copy)]
enum Misc {
    Debug,
    Host,
    ListenPort,
    Precision,
    ServerTimeout,
    UnifyNodes,
    UnifyUnits,
    /// Sets all four verbosity categories at once.
    Verbose(u8),
    VerboseConf(u8),
    VerboseStat(u8),
    VerboseTime(u8),
    VerboseUsed(u8),
    Wait,
}

struct OptDef {
    name: &'static str,
    server_valid: bool,
    action: Action,
}

use Action::*;
use ParIndex::*;

static OPTIONS: &[OptDef] = &[
    OptDef { name: "--access_recv", server_valid: false, action: Long(LocAccessRecv, RemAccessRecv) },
    OptDef { name: "-Ar", server_valid: false, action: Long(LocAccessRecv, RemAccessRecv) },
    OptDef { name: "--affinity", server_valid: false, action: Long(LocAffinity, RemAffinity) },
    OptDef { name: "-a", server_valid: false, action: Long(LocAffinity, RemAffinity) },
    OptDef { name: "--loc_affinity", server_valid: false, action: Long(LocAffinity, PNull) },
    OptDef { name: "-la", server_valid: false, action: Long(LocAffinity, PNull) },
    OptDef { name: "--rem_affinity", server_valid: false, action: Long(RemAffinity, PNull) },
    OptDef { name: "-ra", server_valid: false, action: Long(RemAffinity, PNull) },
    OptDef { name: "--debug", server_valid: true, action: Misc(Misc::Debug) },
    OptDef { name: "-D", server_valid: true, action: Misc(Misc::Debug) },
    OptDef { name: "--flip", server_valid: false, action: Long(LocFlip, RemFlip) },
    OptDef { name: "-f", server_valid: false, action: Long(LocFlip, RemFlip) },
    OptDef { name: "--help", server_valid: false, action: Help },
    OptDef { name: "-h", server_valid: false, action: Help },
    OptDef { name: "--host", server_valid: false, action: Misc(Misc::Host) },
    OptDef { name: "-H", server_valid: false, action: Misc(Misc::Host) },
    OptDef { name: "--id", server_valid: false, action: Strn(LocId, RemId) },
    OptDef { name: "-i", server_valid: false, action: Strn(LocId, RemId) },
    OptDef { name: "--loc_id", server_valid: false, action: Strn(LocId, PNull) },
    OptDef { name: "-li", server_valid: false, action: Strn(LocId, PNull) },
    OptDef { name: "--rem_id", server_valid: false, action: Strn(RemId, PNull) },
    OptDef { name: "-ri", server_valid: false, action: Strn(RemId, PNull) },
    OptDef { name: "--listen_port", server_valid: true, action: Misc(Misc::ListenPort) },
    OptDef { name: "-lp", server_valid: true, action: Misc(Misc::ListenPort) },
    OptDef { name: "--msg_size", server_valid: false, action: Size(LocMsgSize, RemMsgSize) },
    OptDef { name: "-m", server_valid: false, action: Size(LocMsgSize, RemMsgSize) },
    OptDef { name: "--mtu_size", server_valid: false, action: Size(LocMtuSize, RemMtuSize) },
    OptDef { name: "-M", server_valid: false, action: Size(LocMtuSize, RemMtuSize) },
    OptDef { name: "--no_msgs", server_valid: false, action: Long(LocNoMsgs, RemNoMsgs) },
    OptDef { name: "-n", server_valid: false, action: Long(LocNoMsgs, RemNoMsgs) },
    OptDef { name: "--poll", server_valid: false, action: Long(LocPollMode, RemPollMode) },
    OptDef { name: "-P", server_valid: false, action: Long(LocPollMode, RemPollMode) },
    OptDef { name: "--loc_poll", server_valid: false, action: Long(LocPollMode, PNull) },
    OptDef { name: "-lP", server_valid: false, action: Long(LocPollMode, PNull) },
    OptDef { name: "--rem_poll", server_valid: false, action: Long(RemPollMode, PNull) },
    OptDef { name: "-rP", server_valid: false, action: Long(RemPollMode, PNull) },
    OptDef { name: "--port", server_valid: false, action: Long(LocPort, RemPort) },
    OptDef { name: "-p", server_valid: false, action: Long(LocPort, RemPort) },
    OptDef { name: "--precision", server_valid: false, action: Misc(Misc::Precision) },
    OptDef { name: "-e", server_valid: false, action: Misc(Misc::Precision) },
    OptDef { name: "--rd_atomic", server_valid: false, action: Long(LocRdAtomic, RemRdAtomic) },
    OptDef { name: "-R", server_valid: false, action: Long(LocRdAtomic, RemRdAtomic) },
    OptDef { name: "--loc_rd_atomic", server_valid: false, action: Long(LocRdAtomic, PNull) },
    OptDef { name: "-lR", server_valid: false, action: Long(LocRdAtomic, PNull) },
    OptDef { name: "--rem_rd_atomic", server_valid: false, action: Long(RemRdAtomic, PNull) },
    OptDef { name: "-rR", server_valid: false, action: Long(RemRdAtomic, PNull) },
    OptDef { name: "--sock_buf_size", server_valid: false, action: Size(LocSockBufSize, RemSockBufSize) },
    OptDef { name: "-S", server_valid: false, action: Size(LocSockBufSize, RemSockBufSize) },
    OptDef { name: "--loc_sock_buf_size", server_valid: false, action: Size(LocSockBufSize, PNull) },
    OptDef { name: "-lS", server_valid: false, action: Size(LocSockBufSize, PNull) },
    OptDef { name: "--rem_sock_buf_size", server_valid: false, action: Size(RemSockBufSize, PNull) },
    OptDef { name: "-rS", server_valid: false, action: Size(RemSockBufSize, PNull) },
    OptDef { name: "--time", server_valid: false, action: Time(LocTime, RemTime) },
    OptDef { name: "-t", server_valid: false, action: Time(LocTime, RemTime) },
    OptDef { name: "--timeout", server_valid: false, action: Time(LocTimeout, RemTimeout) },
    OptDef { name: "-T", server_valid: false, action: Time(LocTimeout, RemTimeout) },
    OptDef { name: "--loc_timeout", server_valid: false, action: Time(LocTimeout, PNull) },
    OptDef { name: "-lT", server_valid: false, action: Time(LocTimeout, PNull) },
    OptDef { name: "--rem_timeout", server_valid: false, action: Time(RemTimeout, PNull) },
    OptDef { name: "-rT", server_valid: false, action: Time(RemTimeout, PNull) },
    OptDef { name: "--server_timeout", server_valid: false, action: Misc(Misc::ServerTimeout) },
    OptDef { name: "-st", server_valid: false, action: Misc(Misc::ServerTimeout) },
    OptDef { name: "--unify_nodes", server_valid: false, action: Misc(Misc::UnifyNodes) },
    OptDef { name: "-U", server_valid: false, action: Misc(Misc::UnifyNodes) },
    OptDef { name: "--unify_units", server_valid: false, action: Misc(Misc::UnifyUnits) },
    OptDef { name: "-u", server_valid: false, action: Misc(Misc::UnifyUnits) },
    OptDef { name: "--verbose", server_valid: false, action: Misc(Misc::Verbose(1)) },
    OptDef { name: "-v", server_valid: false, action: Misc(Misc::Verbose(1)) },
    OptDef { name: "--verbose_conf", server_valid: false, action: Misc(Misc::VerboseConf(1)) },
    OptDef { name: "-vc", server_valid: false, action: Misc(Misc::VerboseConf(1)) },
    OptDef { name: "--verbose_stat", server_valid: false, action: Misc(Misc::VerboseStat(1)) },
    OptDef { name: "-vs", server_valid: false, action: Misc(Misc::VerboseStat(1)) },
    OptDef { name: "--verbose_time", server_valid: false, action: Misc(Misc::VerboseTime(1)) },
    OptDef { name: "-vt", server_valid: false, action: Misc(Misc::VerboseTime(1)) },
    OptDef { name: "--verbose_used", server_valid: false, action: Misc(Misc::VerboseUsed(1)) },
    OptDef { name: "-vu", server_valid: false, action: Misc(Misc::VerboseUsed(1)) },
    OptDef { name: "--verbose_more", server_valid: false, action: Misc(Misc::Verbose(2)) },
    OptDef { name: "-vv", server_valid: false, action: Misc(Misc::Verbose(2)) },
    OptDef { name: "--verbose_more_conf", server_valid: false, action: Misc(Misc::VerboseConf(2)) },
    OptDef { name: "-vC", server_valid: false, action: Misc(Misc::VerboseConf(2)) },
    OptDef { name: "--verbose_more_stat", server_valid: false, action: Misc(Misc::VerboseStat(2)) },
    OptDef { name: "-vS", server_valid: false, action: Misc(Misc::VerboseStat(2)) },
    OptDef { name: "--verbose_more_time", server_valid: false, action: Misc(Misc::VerboseTime(2)) },
    OptDef { name: "-vT", server_valid: false, action: Misc(Misc::VerboseTime(2)) },
    OptDef { name: "--verbose_more_used", server_valid: false, action: Misc(Misc::VerboseUsed(2)) },
    OptDef { name: "-vU", server_valid: false, action: Misc(Misc::VerboseUsed(2)) },
    OptDef { name: "--version", server_valid: false, action: Version },
    OptDef { name: "-V", server_valid: false, action: Version },
    OptDef { name: "--wait", server_valid: false, action: Misc(Misc::Wait) },
    OptDef { name: "-W", server_valid: false, action: Misc(Misc::Wait) },
];

fn find_option(name: &str) -> Option<&'static OptDef> {
    OPTIONS.iter().find(|opt| opt.name == name)
}

/// Walk argv, filling the context, running tests as they are named, and
/// falling back to server mode when nothing asked for a client.
pub fn do_args(ctx: &mut Ctx, args: &[String]) {
    let mut is_client = false;
    let mut test_specified = false;

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg.starts_with('-') {
            let Some(opt) = find_option(arg) else {
                error_die!("{}: bad option; try qperf --help", arg);
            };
            if !opt.server_valid {
                is_client = true;
            }
            i = apply_option(ctx, opt, args, i);
        } else {
            is_client = true;
            if ctx.server_name.is_none() {
                ctx.server_name = Some(arg.clone());
            } else {
                let Some(index) = find_test(arg) else {
                    error_die!("{}: bad test; try qperf --help", arg);
                };
                ctl::client(ctx, index);
                test_specified = true;
            }
            i += 1;
        }
    }

    if !is_client {
        ctl::server(ctx);
    } else if !test_specified {
        if ctx.server_name.is_none() {
            error_die!(
                "You used a client only option but did not specify the server name.\n\
                 Do you want to be a client or server?"
            );
        }
        if find_test(ctx.server_name.as_deref().unwrap()).is_some() {
            error_die!("Must specify host name first; try qperf --help");
        }
        error_die!("Must specify a test type; try qperf --help");
    }
}

/// Apply one option, returning the index of the next argv token.
fn apply_option(ctx: &mut Ctx, opt: &'static OptDef, args: &[String], i: usize) -> usize {
    match opt.action {
        Action::Long(loc, rem) => {
            let (v, next) = arg_long(args, i);
            ctx.setp_u32(Some(opt.name), loc, v);
            ctx.setp_u32(Some(opt.name), rem, v);
            next
        }
        Action::Size(loc, rem) => {
            let (v, next) = arg_size(args, i);
            ctx.setp_u32(Some(opt.name), loc, v as u32);
            ctx.setp_u32(Some(opt.name), rem, v as u32);
            next
        }
        Action::Time(loc, rem) => {
            let (v, next) = arg_time(args, i);
            ctx.setp_u32(Some(opt.name), loc, v as u32);
            ctx.setp_u32(Some(opt.name), rem, v as u32);
            next
        }
        Action::Strn(loc, rem) => {
            let (s, next) = arg_strn(args, i);
            ctx.setp_str(Some(opt.name), loc, s);
            ctx.setp_str(Some(opt.name), rem, s);
            next
        }
        Action::Misc(misc) => apply_misc(ctx, misc, args, i),
        Action::Help => opt_help(args, i),
        Action::Version => {
            println!("qperf {}.{}.{}", VER_MAJ, VER_MIN, VER_INC);
            std::process::exit(0);
        }
    }
}

fn apply_misc(ctx: &mut Ctx, misc: Misc, args: &[String], i: usize) -> usize {
    match misc {
        Misc::Debug => {
            ctx.view.debug = true;
            i + 1
        }
        Misc::Host => {
            let (s, next) = arg_strn(args, i);
            ctx.server_name = Some(s.to_string());
            next
        }
        Misc::ListenPort => {
            let (v, next) = arg_long(args, i);
            ctx.listen_port = v as u16;
            next
        }
        Misc::Precision => {
            let (v, next) = arg_long(args, i);
            ctx.view.precision = v as usize;
            next
        }
        Misc::ServerTimeout => {
            let (v, next) = arg_time(args, i);
            ctx.server_timeout = v as u32;
            next
        }
        Misc::UnifyNodes => {
            ctx.view.unify_nodes = true;
            i + 1
        }
        Misc::UnifyUnits => {
            ctx.view.unify_units = true;
            i + 1
        }
        Misc::Verbose(level) => {
            ctx.view.set_verbose_all(level);
            i + 1
        }
        Misc::VerboseConf(level) => {
            ctx.view.verbose_conf = level;
            i + 1
        }
        Misc::VerboseStat(level) => {
            ctx.view.verbose_stat = level;
            i + 1
        }
        Misc::VerboseTime(level) => {
            ctx.view.verbose_time = level;
            i + 1
        }
        Misc::VerboseUsed(level) => {
            ctx.view.verbose_used = level;
            i + 1
        }
        Misc::Wait => {
            let (v, next) = arg_time(args, i);
            ctx.wait = v as u32;
            next
        }
    }
}

fn arg_value<'a>(args: &'a [String], i: usize) -> &'a str {
    match args.get(i + 1) {
        Some(v) => v,
        None => error_die!("Missing argument to {}", args[i]),
    }
}

fn arg_long(args: &[String], i: usize) -> (u32, usize) {
    let val = arg_value(args, i);
    let l: i64 = match val.parse() {
        Ok(l) => l,
        Err(_) => error_die!("Bad argument: {}", val),
    };
    if l < 0 {
        error_die!("{} requires a non-negative number", args[i]);
    }
    (l as u32, i + 2)
}

fn arg_size(args: &[String], i: usize) -> (i64, usize) {
    let val = arg_value(args, i);
    let Some(l) = parse_size(val) else {
        error_die!("Bad argument: {}", val);
    };
    if l < 0 {
        error_die!("{} requires a non-negative number", args[i]);
    }
    (l, i + 2)
}

fn arg_time(args: &[String], i: usize) -> (i64, usize) {
    let val = arg_value(args, i);
    let Some(l) = parse_time(val) else {
        error_die!("Bad argument: {}", val);
    };
    if l < 0 {
        error_die!("{} requires a non-negative number", args[i]);
    }
    (l, i + 2)
}

fn arg_strn<'a>(args: &'a [String], i: usize) -> (&'a str, usize) {
    (arg_value(args, i), i + 2)
}

/// Split a decimal number from its trailing suffix. Blanks may separate the
/// two; the sign, if any, stays with the number.
fn split_suffix(s: &str) -> Option<(f64, &str)> {
    let s = s.trim();
    let bytes = s.as_bytes();
    let mut split = 0;
    if matches!(bytes.first(), Some(b'-') | Some(b'+')) {
        split = 1;
    }
    while split < bytes.len() && (bytes[split].is_ascii_digit() || bytes[split] == b'.') {
        split += 1;
    }
    let (num, suffix) = s.split_at(split);
    let value: f64 = num.parse().ok()?;
    Some((value, suffix.trim_start()))
}

/// Parse a size: a decimal count of bytes with an optional scale suffix.
/// The single letters are case sensitive (k is 1000, K is 1024); the spelt
/// out forms are not.
pub fn parse_size(s: &str) -> Option<i64> {
    let (value, suffix) = split_suffix(s)?;
    let mult: f64 = match suffix {
        "" => 1.0,
        "k" => 1e3,
        "m" => 1e6,
        "g" => 1e9,
        "K" => 1024.0,
        "M" => (1u64 << 20) as f64,
        "G" => (1u64 << 30) as f64,
        _ => match suffix.to_ascii_lowercase().as_str() {
            "kb" => 1e3,
            "mb" => 1e6,
            "gb" => 1e9,
            "kib" => 1024.0,
            "mib" => (1u64 << 20) as f64,
            "gib" => (1u64 << 30) as f64,
            _ => return None,
        },
    };
    Some((value * mult) as i64)
}

/// Parse a duration in seconds with an optional m/h/d scale suffix.
pub fn parse_time(s: &str) -> Option<i64> {
    let (value, suffix) = split_suffix(s)?;
    let mult: f64 = match suffix {
        "" | "s" | "S" => 1.0,
        "m" | "M" => 60.0,
        "h" | "H" => 3600.0,
        "d" | "D" => 86400.0,
        _ => return None,
    };
    Some((value * mult) as i64)
}

fn opt_help(args: &[String], i: usize) -> ! {
    let category = args.get(i + 1).map(|s| s.as_str()).unwrap_or("main");
    for (name, text) in USAGE {
        if *name == category {
            print!("{}", text);
            std::process::exit(0);
        }
    }
    error_die!("Cannot find help category {}; try: qperf --help", category);
}

static USAGE: &[(&str, &str)] = &[
    (
        "main",
        "\
Usage: qperf [options] [server-hostname [tests]]

Run without arguments to act as the server; name a server and one or more
tests to act as the client. Try \"qperf --help tests\" for the test list.

Common options (loc_/rem_ forms set only one side):
  -m,  --msg_size size       message size (suffixes: kb/mb/gb, kib/mib/gib)
  -t,  --time duration       test duration (suffixes: s/m/h/d, default 2s)
  -n,  --no_msgs count       send a fixed number of messages instead
  -p,  --port port           port the data socket should use
  -S,  --sock_buf_size size  socket buffer sizes
  -a,  --affinity cpu        pin each side to a processor (1 based)
  -i,  --id string           tag the request
  -T,  --timeout duration    message timeout (default 5s)
  -W,  --wait duration       keep retrying the connect to the server
  -H,  --host hostname       alternate way of naming the server
  -lp, --listen_port port    server listen port (default 19765)
  -st, --server_timeout t    server patience for a request
  -e,  --precision digits    significant digits shown (default 3)
  -u,  --unify_units         raw numbers, no unit ladders or commas
  -U,  --unify_nodes         keep loc/rem labels even for one-way traffic
  -v -vc -vs -vt -vu         verbose (conf/stat/time/used); capitals mean more
  -D,  --debug               debug output
  -V,  --version             print the version and exit
",
    ),
    (
        "tests",
        "\
Tests (client usage: qperf server-hostname test ...):
  conf     show the configuration of both nodes
  quit     ask the server worker to quit
  tcp_bw   TCP streaming one-way bandwidth
  tcp_lat  TCP round-trip latency
  udp_bw   UDP streaming one-way bandwidth
  udp_lat  UDP round-trip latency
",
    ),
];
