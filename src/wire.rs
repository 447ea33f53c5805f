//! Fixed-layout codec for the records crossing the control connection.
//! Integers are written least significant byte first for exactly their
//! declared width; strings are raw fixed-length buffers. There is no framing
//! and no variable-length data, so both records have a compile-time size.

use crate::params::Req;
use crate::stat::{Stat, Ustat, T_N};
use crate::STRSIZE;

/// Four u16 fields, twelve u32 fields, one STRSIZE id buffer.
pub const REQ_SIZE: usize = 4 * 2 + 12 * 4 + STRSIZE;
/// Three u32 fields, two tick vectors, four counter triples.
pub const STAT_SIZE: usize = 3 * 4 + 2 * T_N * 8 + 4 * 3 * 8;

struct Encoder<'a> {
    buf: &'a mut [u8],
    off: usize,
}

impl<'a> Encoder<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Encoder { buf, off: 0 }
    }

    fn put_uint(&mut self, v: u64, n: usize) {
        for i in 0..n {
            self.buf[self.off + i] = (v >> (8 * i)) as u8;
        }
        self.off += n;
    }

    fn put_bytes(&mut self, b: &[u8]) {
        self.buf[self.off..self.off + b.len()].copy_from_slice(b);
        self.off += b.len();
    }
}

struct Decoder<'a> {
    buf: &'a [u8],
    off: usize,
}

impl<'a> Decoder<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Decoder { buf, off: 0 }
    }

    fn get_uint(&mut self, n: usize) -> u64 {
        let mut v = 0u64;
        for i in 0..n {
            v |= (self.buf[self.off + i] as u64) << (8 * i);
        }
        self.off += n;
        v
    }

    fn get_bytes(&mut self, out: &mut [u8]) {
        out.copy_from_slice(&self.buf[self.off..self.off + out.len()]);
        self.off += out.len();
    }
}

pub fn encode_req(req: &Req, buf: &mut [u8; REQ_SIZE]) {
    let mut e = Encoder::new(buf);
    e.put_uint(req.ver_maj as u64, 2);
    e.put_uint(req.ver_min as u64, 2);
    e.put_uint(req.ver_inc as u64, 2);
    e.put_uint(req.req_index as u64, 2);
    e.put_uint(req.flip as u64, 4);
    e.put_uint(req.access_recv as u64, 4);
    e.put_uint(req.affinity as u64, 4);
    e.put_uint(req.poll_mode as u64, 4);
    e.put_uint(req.port as u64, 4);
    e.put_uint(req.rd_atomic as u64, 4);
    e.put_uint(req.timeout as u64, 4);
    e.put_uint(req.msg_size as u64, 4);
    e.put_uint(req.mtu_size as u64, 4);
    e.put_uint(req.no_msgs as u64, 4);
    e.put_uint(req.sock_buf_size as u64, 4);
    e.put_uint(req.time as u64, 4);
    e.put_bytes(&req.id);
    debug_assert_eq!(e.off, REQ_SIZE);
}

pub fn decode_req(buf: &[u8; REQ_SIZE]) -> Req {
    let mut d = Decoder::new(buf);
    let mut req = Req {
        ver_maj: d.get_uint(2) as u16,
        ver_min: d.get_uint(2) as u16,
        ver_inc: d.get_uint(2) as u16,
        req_index: d.get_uint(2) as u16,
        flip: d.get_uint(4) as u32,
        access_recv: d.get_uint(4) as u32,
        affinity: d.get_uint(4) as u32,
        poll_mode: d.get_uint(4) as u32,
        port: d.get_uint(4) as u32,
        rd_atomic: d.get_uint(4) as u32,
        timeout: d.get_uint(4) as u32,
        msg_size: d.get_uint(4) as u32,
        mtu_size: d.get_uint(4) as u32,
        no_msgs: d.get_uint(4) as u32,
        sock_buf_size: d.get_uint(4) as u32,
        time: d.get_uint(4) as u32,
        id: [0; STRSIZE],
    };
    d.get_bytes(&mut req.id);
    debug_assert_eq!(d.off, REQ_SIZE);
    req
}

fn enc_ustat(e: &mut Encoder, u: &Ustat) {
    e.put_uint(u.no_bytes, 8);
    e.put_uint(u.no_msgs, 8);
    e.put_uint(u.no_errs, 8);
}

fn dec_ustat(d: &mut Decoder) -> Ustat {
    Ustat {
        no_bytes: d.get_uint(8),
        no_msgs: d.get_uint(8),
        no_errs: d.get_uint(8),
    }
}

pub fn encode_stat(stat: &Stat, buf: &mut [u8; STAT_SIZE]) {
    let mut e = Encoder::new(buf);
    e.put_uint(stat.no_cpus as u64, 4);
    e.put_uint(stat.no_ticks as u64, 4);
    e.put_uint(stat.max_cqes as u64, 4);
    for t in &stat.time_s {
        e.put_uint(*t, 8);
    }
    for t in &stat.time_e {
        e.put_uint(*t, 8);
    }
    enc_ustat(&mut e, &stat.s);
    enc_ustat(&mut e, &stat.r);
    enc_ustat(&mut e, &stat.rem_s);
    enc_ustat(&mut e, &stat.rem_r);
    debug_assert_eq!(e.off, STAT_SIZE);
}

pub fn decode_stat(buf: &[u8; STAT_SIZE]) -> Stat {
    let mut d = Decoder::new(buf);
    let mut stat = Stat {
        no_cpus: d.get_uint(4) as u32,
        no_ticks: d.get_uint(4) as u32,
        max_cqes: d.get_uint(4) as u32,
        ..Stat::default()
    };
    for i in 0..T_N {
        stat.time_s[i] = d.get_uint(8);
    }
    for i in 0..T_N {
        stat.time_e[i] = d.get_uint(8);
    }
    stat.s = dec_ustat(&mut d);
    stat.r = dec_ustat(&mut d);
    stat.rem_s = dec_ustat(&mut d);
    stat.rem_r = dec_ustat(&mut d);
    debug_assert_eq!(d.off, STAT_SIZE);
    stat
}
