//! Typed parameter registry. Every user visible parameter exists twice: a
//! local index writing into `Ctx.req` and a remote index writing into
//! `Ctx.rreq`. The option layer may set one or both sides; tests mark the
//! parameters they honor so unused settings can be reported.

use log::error;

use crate::{bug_die, error_die, Ctx, STRSIZE};

/// Request record negotiated between client and server. Field order and
/// widths are the wire layout; see [`crate::wire`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Req {
    pub ver_maj: u16,
    pub ver_min: u16,
    pub ver_inc: u16,
    pub req_index: u16,
    pub flip: u32,
    pub access_recv: u32,
    pub affinity: u32,
    pub poll_mode: u32,
    pub port: u32,
    pub rd_atomic: u32,
    pub timeout: u32,
    pub msg_size: u32,
    pub mtu_size: u32,
    pub no_msgs: u32,
    pub sock_buf_size: u32,
    pub time: u32,
    pub id: [u8; STRSIZE],
}

impl Req {
    pub fn id_str(&self) -> &str {
        let end = self.id.iter().position(|&b| b == 0).unwrap_or(STRSIZE);
        std::str::from_utf8(&self.id[..end]).unwrap_or("")
    }
}

/// Index into the parameter table. The discriminants must match the table
/// position; [`check_table_order`] aborts startup otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum ParIndex {
    /// Explicit no-op sentinel used by one-sided options.
    PNull = 0,
    LocAccessRecv,
    RemAccessRecv,
    LocAffinity,
    RemAffinity,
    LocFlip,
    RemFlip,
    LocId,
    RemId,
    LocMsgSize,
    RemMsgSize,
    LocMtuSize,
    RemMtuSize,
    LocNoMsgs,
    RemNoMsgs,
    LocPollMode,
    RemPollMode,
    LocPort,
    RemPort,
    LocRdAtomic,
    RemRdAtomic,
    LocSockBufSize,
    RemSockBufSize,
    LocTime,
    RemTime,
    LocTimeout,
    RemTimeout,
}

pub const P_N: usize = 27;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParType {
    Long,
    Size,
    Time,
    Str,
}

struct ParDef {
    index: ParIndex,
    ptype: ParType,
}

/// Must be listed in the same order as the indices are defined.
static PAR_TABLE: [ParDef; P_N] = [
    ParDef { index: ParIndex::PNull, ptype: ParType::Long },
    ParDef { index: ParIndex::LocAccessRecv, ptype: ParType::Long },
    ParDef { index: ParIndex::RemAccessRecv, ptype: ParType::Long },
    ParDef { index: ParIndex::LocAffinity, ptype: ParType::Long },
    ParDef { index: ParIndex::RemAffinity, ptype: ParType::Long },
    ParDef { index: ParIndex::LocFlip, ptype: ParType::Long },
    ParDef { index: ParIndex::RemFlip, ptype: ParType::Long },
    ParDef { index: ParIndex::LocId, ptype: ParType::Str },
    ParDef { index: ParIndex::RemId, ptype: ParType::Str },
    ParDef { index: ParIndex::LocMsgSize, ptype: ParType::Size },
    ParDef { index: ParIndex::RemMsgSize, ptype: ParType::Size },
    ParDef { index: ParIndex::LocMtuSize, ptype: ParType::Size },
    ParDef { index: ParIndex::RemMtuSize, ptype: ParType::Size },
    ParDef { index: ParIndex::LocNoMsgs, ptype: ParType::Long },
    ParDef { index: ParIndex::RemNoMsgs, ptype: ParType::Long },
    ParDef { index: ParIndex::LocPollMode, ptype: ParType::Long },
    ParDef { index: ParIndex::RemPollMode, ptype: ParType::Long },
    ParDef { index: ParIndex::LocPort, ptype: ParType::Long },
    ParDef { index: ParIndex::RemPort, ptype: ParType::Long },
    ParDef { index: ParIndex::LocRdAtomic, ptype: ParType::Long },
    ParDef { index: ParIndex::RemRdAtomic, ptype: ParType::Long },
    ParDef { index: ParIndex::LocSockBufSize, ptype: ParType::Size },
    ParDef { index: ParIndex::RemSockBufSize, ptype: ParType::Size },
    ParDef { index: ParIndex::LocTime, ptype: ParType::Time },
    ParDef { index: ParIndex::RemTime, ptype: ParType::Time },
    ParDef { index: ParIndex::LocTimeout, ptype: ParType::Time },
    ParDef { index: ParIndex::RemTimeout, ptype: ParType::Time },
];

pub fn check_table_order() {
    for (i, def) in PAR_TABLE.iter().enumerate() {
        if def.index as usize != i {
            bug_die!("params: table out of order: {}", i);
        }
    }
}

/// Local/remote index pair of one user visible parameter, used to print out
/// the names of the parameters that have been set.
pub struct ParName {
    pub name: &'static str,
    pub loc: ParIndex,
    pub rem: ParIndex,
    pub ptype: ParType,
}

pub static PAR_NAMES: [ParName; 13] = [
    ParName { name: "access_recv", loc: ParIndex::LocAccessRecv, rem: ParIndex::RemAccessRecv, ptype: ParType::Long },
    ParName { name: "affinity", loc: ParIndex::LocAffinity, rem: ParIndex::RemAffinity, ptype: ParType::Long },
    ParName { name: "flip", loc: ParIndex::LocFlip, rem: ParIndex::RemFlip, ptype: ParType::Long },
    ParName { name: "id", loc: ParIndex::LocId, rem: ParIndex::RemId, ptype: ParType::Str },
    ParName { name: "msg_size", loc: ParIndex::LocMsgSize, rem: ParIndex::RemMsgSize, ptype: ParType::Size },
    ParName { name: "mtu_size", loc: ParIndex::LocMtuSize, rem: ParIndex::RemMtuSize, ptype: ParType::Size },
    ParName { name: "no_msgs", loc: ParIndex::LocNoMsgs, rem: ParIndex::RemNoMsgs, ptype: ParType::Long },
    ParName { name: "poll_mode", loc: ParIndex::LocPollMode, rem: ParIndex::RemPollMode, ptype: ParType::Long },
    ParName { name: "port", loc: ParIndex::LocPort, rem: ParIndex::RemPort, ptype: ParType::Long },
    ParName { name: "rd_atomic", loc: ParIndex::LocRdAtomic, rem: ParIndex::RemRdAtomic, ptype: ParType::Long },
    ParName { name: "sock_buf_size", loc: ParIndex::LocSockBufSize, rem: ParIndex::RemSockBufSize, ptype: ParType::Size },
    ParName { name: "time", loc: ParIndex::LocTime, rem: ParIndex::RemTime, ptype: ParType::Time },
    ParName { name: "timeout", loc: ParIndex::LocTimeout, rem: ParIndex::RemTimeout, ptype: ParType::Time },
];

/// Per-parameter bookkeeping. `name` doubles as the "was explicitly set"
/// record: it holds the spelling of the option that last set the parameter.
#[derive(Clone, Copy, Default)]
pub struct ParMeta {
    pub name: Option<&'static str>,
    pub set: bool,
    pub used: bool,
    pub inuse: bool,
}

#[derive(Default)]
pub struct ParTable {
    meta: [ParMeta; P_N],
}

impl ParTable {
    pub fn meta(&self, index: ParIndex) -> &ParMeta {
        &self.meta[index as usize]
    }

    pub fn clear_inuse(&mut self) {
        for m in self.meta.iter_mut() {
            m.inuse = false;
        }
    }
}

/// A reference to the storage cell behind a parameter index.
enum Cell<'a> {
    U32(&'a mut u32),
    Str(&'a mut [u8; STRSIZE]),
}

/// Read-only snapshot of a parameter value.
pub enum ParValue {
    U32(u32),
    Str(String),
}

impl Ctx {
    fn cell(&mut self, index: ParIndex) -> Cell<'_> {
        use ParIndex::*;
        match index {
            PNull => bug_die!("params: storage request for the null parameter"),
            LocAccessRecv => Cell::U32(&mut self.req.access_recv),
            RemAccessRecv => Cell::U32(&mut self.rreq.access_recv),
            LocAffinity => Cell::U32(&mut self.req.affinity),
            RemAffinity => Cell::U32(&mut self.rreq.affinity),
            LocFlip => Cell::U32(&mut self.req.flip),
            RemFlip => Cell::U32(&mut self.rreq.flip),
            LocId => Cell::Str(&mut self.req.id),
            RemId => Cell::Str(&mut self.rreq.id),
            LocMsgSize => Cell::U32(&mut self.req.msg_size),
            RemMsgSize => Cell::U32(&mut self.rreq.msg_size),
            LocMtuSize => Cell::U32(&mut self.req.mtu_size),
            RemMtuSize => Cell::U32(&mut self.rreq.mtu_size),
            LocNoMsgs => Cell::U32(&mut self.req.no_msgs),
            RemNoMsgs => Cell::U32(&mut self.rreq.no_msgs),
            LocPollMode => Cell::U32(&mut self.req.poll_mode),
            RemPollMode => Cell::U32(&mut self.rreq.poll_mode),
            LocPort => Cell::U32(&mut self.req.port),
            RemPort => Cell::U32(&mut self.rreq.port),
            LocRdAtomic => Cell::U32(&mut self.req.rd_atomic),
            RemRdAtomic => Cell::U32(&mut self.rreq.rd_atomic),
            LocSockBufSize => Cell::U32(&mut self.req.sock_buf_size),
            RemSockBufSize => Cell::U32(&mut self.rreq.sock_buf_size),
            LocTime => Cell::U32(&mut self.req.time),
            RemTime => Cell::U32(&mut self.rreq.time),
            LocTimeout => Cell::U32(&mut self.req.timeout),
            RemTimeout => Cell::U32(&mut self.rreq.timeout),
        }
    }

    pub fn par_value(&self, index: ParIndex) -> ParValue {
        use ParIndex::*;
        let (req, rreq) = (&self.req, &self.rreq);
        match index {
            PNull => bug_die!("params: value request for the null parameter"),
            LocAccessRecv => ParValue::U32(req.access_recv),
            RemAccessRecv => ParValue::U32(rreq.access_recv),
            LocAffinity => ParValue::U32(req.affinity),
            RemAffinity => ParValue::U32(rreq.affinity),
            LocFlip => ParValue::U32(req.flip),
            RemFlip => ParValue::U32(rreq.flip),
            LocId => ParValue::Str(req.id_str().to_string()),
            RemId => ParValue::Str(rreq.id_str().to_string()),
            LocMsgSize => ParValue::U32(req.msg_size),
            RemMsgSize => ParValue::U32(rreq.msg_size),
            LocMtuSize => ParValue::U32(req.mtu_size),
            RemMtuSize => ParValue::U32(rreq.mtu_size),
            LocNoMsgs => ParValue::U32(req.no_msgs),
            RemNoMsgs => ParValue::U32(rreq.no_msgs),
            LocPollMode => ParValue::U32(req.poll_mode),
            RemPollMode => ParValue::U32(rreq.poll_mode),
            LocPort => ParValue::U32(req.port),
            RemPort => ParValue::U32(rreq.port),
            LocRdAtomic => ParValue::U32(req.rd_atomic),
            RemRdAtomic => ParValue::U32(rreq.rd_atomic),
            LocSockBufSize => ParValue::U32(req.sock_buf_size),
            RemSockBufSize => ParValue::U32(rreq.sock_buf_size),
            LocTime => ParValue::U32(req.time),
            RemTime => ParValue::U32(rreq.time),
            LocTimeout => ParValue::U32(req.timeout),
            RemTimeout => ParValue::U32(rreq.timeout),
        }
    }

    /// Record an assignment in the bookkeeping. Returns false when the
    /// storage must be left alone: either the index is the null sentinel or
    /// a no-name (default) assignment hits a parameter the user already set.
    fn par_set(&mut self, name: Option<&'static str>, index: ParIndex) -> bool {
        if index == ParIndex::PNull {
            return false;
        }
        let m = &mut self.par.meta[index as usize];
        if let Some(name) = name {
            m.name = Some(name);
            m.set = true;
        } else {
            m.used = true;
            m.inuse = true;
            if m.name.is_some() {
                return false;
            }
        }
        true
    }

    /// Set a 32 bit value without letting anyone know it was set.
    pub fn setv_u32(&mut self, index: ParIndex, v: u32) {
        if index == ParIndex::PNull {
            return;
        }
        match self.cell(index) {
            Cell::U32(p) => *p = v,
            Cell::Str(_) => bug_die!("params: numeric write to a string parameter"),
        }
    }

    pub fn setp_u32(&mut self, name: Option<&'static str>, index: ParIndex, v: u32) {
        if !self.par_set(name, index) {
            return;
        }
        match self.cell(index) {
            Cell::U32(p) => *p = v,
            Cell::Str(_) => bug_die!("params: numeric write to a string parameter"),
        }
    }

    pub fn setp_str(&mut self, name: Option<&'static str>, index: ParIndex, s: &str) {
        if !self.par_set(name, index) {
            return;
        }
        if s.len() >= STRSIZE {
            error_die!("{}: too long", s);
        }
        match self.cell(index) {
            Cell::Str(p) => {
                p.fill(0);
                p[..s.len()].copy_from_slice(s.as_bytes());
            }
            Cell::U32(_) => bug_die!("params: string write to a numeric parameter"),
        }
    }

    /// Note a parameter as being honored by the current test.
    pub fn par_use(&mut self, index: ParIndex) {
        if index == ParIndex::PNull {
            return;
        }
        let m = &mut self.par.meta[index as usize];
        m.used = true;
        m.inuse = true;
    }

    pub fn par_isset(&self, index: ParIndex) -> bool {
        self.par.meta[index as usize].name.is_some()
    }

    /// Warn about parameters the user set that the current test ignores.
    /// The paired entry sharing the same option spelling is silenced so a
    /// both-sides option warns only once.
    pub fn opt_check(&mut self) {
        for i in 0..P_N {
            let m = self.par.meta[i];
            if m.used || !m.set {
                continue;
            }
            error!(
                "warning: {} set but not used in test {}",
                m.name.unwrap_or("?"),
                self.test_name
            );
            for j in i + 1..P_N {
                let q = &mut self.par.meta[j];
                if q.set && q.name == m.name {
                    q.set = false;
                }
            }
        }
    }
}

pub fn par_type(index: ParIndex) -> ParType {
    PAR_TABLE[index as usize].ptype
}
