//! The two administrative tests: "conf" trades host descriptions so either
//! operator can see what the other end is running, and "quit" shuts a
//! server worker down cleanly.

use crate::{ctl, mesg, syserror_die, Ctx, STRSIZE, VER_INC, VER_MAJ, VER_MIN};

const CONF_SIZE: usize = 4 * STRSIZE;

/// Host description: all fixed-size strings so the record needs no framing.
struct Conf {
    node: [u8; STRSIZE],
    cpu: [u8; STRSIZE],
    os: [u8; STRSIZE],
    qperf: [u8; STRSIZE],
}

impl Conf {
    fn encode(&self, buf: &mut [u8; CONF_SIZE]) {
        buf[..STRSIZE].copy_from_slice(&self.node);
        buf[STRSIZE..2 * STRSIZE].copy_from_slice(&self.cpu);
        buf[2 * STRSIZE..3 * STRSIZE].copy_from_slice(&self.os);
        buf[3 * STRSIZE..].copy_from_slice(&self.qperf);
    }

    fn decode(buf: &[u8; CONF_SIZE]) -> Conf {
        let mut conf = Conf {
            node: [0; STRSIZE],
            cpu: [0; STRSIZE],
            os: [0; STRSIZE],
            qperf: [0; STRSIZE],
        };
        conf.node.copy_from_slice(&buf[..STRSIZE]);
        conf.cpu.copy_from_slice(&buf[STRSIZE..2 * STRSIZE]);
        conf.os.copy_from_slice(&buf[2 * STRSIZE..3 * STRSIZE]);
        conf.qperf.copy_from_slice(&buf[3 * STRSIZE..]);
        conf
    }
}

fn strfield(s: &str) -> [u8; STRSIZE] {
    let mut out = [0u8; STRSIZE];
    let n = s.len().min(STRSIZE - 1);
    out[..n].copy_from_slice(&s.as_bytes()[..n]);
    out
}

fn field_str(field: &[u8; STRSIZE]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(STRSIZE);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

pub fn run_client_conf(ctx: &mut Ctx) -> Result<(), &'static str> {
    ctl::client_send_request(ctx)?;
    let mut buf = [0u8; CONF_SIZE];
    mesg::recv_mesg(ctx, &mut buf, "configuration")?;
    let rconf = Conf::decode(&buf);
    let lconf = get_conf();
    ctx.view.view_strn('a', "", "loc_node", &field_str(&lconf.node));
    ctx.view.view_strn('a', "", "loc_cpu", &field_str(&lconf.cpu));
    ctx.view.view_strn('a', "", "loc_os", &field_str(&lconf.os));
    ctx.view.view_strn('a', "", "loc_qperf", &field_str(&lconf.qperf));
    ctx.view.view_strn('a', "", "rem_node", &field_str(&rconf.node));
    ctx.view.view_strn('a', "", "rem_cpu", &field_str(&rconf.cpu));
    ctx.view.view_strn('a', "", "rem_os", &field_str(&rconf.os));
    ctx.view.view_strn('a', "", "rem_qperf", &field_str(&rconf.qperf));
    ctx.successful = true;
    Ok(())
}

pub fn run_server_conf(ctx: &mut Ctx) -> Result<(), &'static str> {
    let conf = get_conf();
    let mut buf = [0u8; CONF_SIZE];
    conf.encode(&mut buf);
    mesg::send_mesg(ctx, &buf, "configuration")?;
    ctx.successful = true;
    Ok(())
}

pub fn run_client_quit(ctx: &mut Ctx) -> Result<(), &'static str> {
    ctx.opt_check();
    ctl::client_send_request(ctx)?;
    ctl::synchronize(ctx)?;
    std::process::exit(0);
}

/// The read waits for the client to go away first so everything closes
/// down cleanly before the worker exits.
pub fn run_server_quit(ctx: &mut Ctx) -> Result<(), &'static str> {
    ctl::synchronize(ctx)?;
    let mut buf = [0u8; 1];
    unsafe {
        libc::read(ctx.remote_fd, buf.as_mut_ptr() as *mut libc::c_void, 1);
    }
    std::process::exit(0);
}

fn get_conf() -> Conf {
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } < 0 {
        syserror_die!("uname failed");
    }
    let node = cstr(&uts.nodename);
    let os = format!("{} {}", cstr(&uts.sysname), cstr(&uts.release));

    Conf {
        node: strfield(&node),
        cpu: strfield(&get_cpu()),
        os: strfield(&os),
        qperf: strfield(&format!("{}.{}.{}", VER_MAJ, VER_MIN, VER_INC)),
    }
}

fn cstr(field: &[libc::c_char; 65]) -> String {
    let bytes: Vec<u8> = field
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Describe the processors: count, cleaned-up model name and, if the name
/// itself lacks one, the clock rate.
fn get_cpu() -> String {
    let text = match std::fs::read_to_string("/proc/cpuinfo") {
        Ok(text) => text,
        Err(_) => syserror_die!("Cannot open /proc/cpuinfo"),
    };

    let mut cpus = 0;
    let mut mixed = false;
    let mut model = String::new();
    let mut mhz = String::new();
    for line in text.lines() {
        if let Some(v) = value_of(line, "model name") {
            cpus += 1;
            if !mixed {
                if model.is_empty() {
                    model = v.to_string();
                } else if model != v {
                    mixed = true;
                }
            }
        } else if let Some(v) = value_of(line, "cpu MHz") {
            if !mixed {
                if mhz.is_empty() {
                    mhz = v.to_string();
                } else if mhz != v {
                    mixed = true;
                }
            }
        }
    }

    let count = match cpus {
        0 | 1 => String::new(),
        2 => "Dual-Core ".to_string(),
        4 => "Quad-Core ".to_string(),
        n => format!("{}-Core ", n),
    };

    if mixed {
        return format!("{}Mixed CPUs", count);
    }

    let name = clean_model(&model);
    let mut speed = String::new();
    if !name.ends_with("Hz") {
        if let Ok(freq) = mhz.parse::<f64>() {
            if freq < 1000.0 {
                speed = format!(" {}MHz", freq as u32);
            } else {
                speed = format!(" {:.1}GHz", freq / 1000.0);
            }
        }
    }
    format!("{}{}{}", count, name, speed)
}

/// The text after the colon of a "key : value" cpuinfo line, if the key
/// matches case-insensitively.
fn value_of<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    if line.len() < key.len() || !line.as_bytes()[..key.len()].eq_ignore_ascii_case(key.as_bytes()) {
        return None;
    }
    let (_, rest) = line.split_once(':')?;
    Some(rest.trim())
}

/// Strip trademark noise and filler words out of a CPU model string.
fn clean_model(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::new();
    let mut i = 0;
    while i < bytes.len() {
        if matches_at(bytes, i, b"(r)") {
            i += 3;
        } else if matches_at(bytes, i, b"(tm)") {
            i += 4;
        } else if matches_at(bytes, i, b"cpu ") {
            i += 4;
        } else if matches_at(bytes, i, b"processor ") {
            i += 10;
        } else if bytes[i] == b' ' && i + 1 < bytes.len() && bytes[i + 1] == b' ' {
            i += 1;
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }
    out.trim().to_string()
}

fn matches_at(hay: &[u8], at: usize, needle: &[u8]) -> bool {
    hay.len() >= at + needle.len() && hay[at..at + needle.len()].eq_ignore_ascii_case(needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_lose_their_noise() {
        assert_eq!(
            clean_model("Intel(R) Xeon(R) CPU E5-2680 v4 @ 2.40GHz"),
            "Intel Xeon E5-2680 v4 @ 2.40GHz"
        );
        assert_eq!(clean_model("AMD EPYC  7543 32-Core Processor "), "AMD EPYC 7543 32-Core");
    }

    #[test]
    fn cpuinfo_lines_split_at_the_colon() {
        assert_eq!(value_of("model name\t: Foo CPU", "model name"), Some("Foo CPU"));
        assert_eq!(value_of("cpu MHz\t\t: 2400.000", "cpu mhz"), Some("2400.000"));
        assert_eq!(value_of("flags\t\t: fpu vme", "model name"), None);
    }

    #[test]
    fn conf_record_round_trips() {
        let conf = Conf {
            node: strfield("apollo"),
            cpu: strfield("Quad-Core Xeon 2.4GHz"),
            os: strfield("Linux 6.1.0"),
            qperf: strfield("0.2.0"),
        };
        let mut buf = [0u8; CONF_SIZE];
        conf.encode(&mut buf);
        let back = Conf::decode(&buf);
        assert_eq!(field_str(&back.node), "apollo");
        assert_eq!(field_str(&back.cpu), "Quad-Core Xeon 2.4GHz");
        assert_eq!(field_str(&back.os), "Linux 6.1.0");
        assert_eq!(field_str(&back.qperf), "0.2.0");
    }

    #[test]
    fn long_strings_truncate_inside_the_field() {
        let field = strfield("AMD EPYC 7543 32-Core Processor With Extras");
        assert_eq!(field[STRSIZE - 1], 0);
        assert_eq!(field_str(&field).len(), STRSIZE - 1);
    }
}
