//! The tests themselves. Each is a client/server pair of bodies built on
//! the core services; the position in the table is the index carried by the
//! request, so both ends must be built from the same list (the version gate
//! enforces that).

mod conf;

use crate::Ctx;

pub struct TestDef {
    pub name: &'static str,
    pub client: fn(&mut Ctx) -> Result<(), &'static str>,
    pub server: fn(&mut Ctx) -> Result<(), &'static str>,
}

pub static TESTS: &[TestDef] = &[
    TestDef { name: "conf", client: conf::run_client_conf, server: conf::run_server_conf },
    TestDef { name: "quit", client: conf::run_client_quit, server: conf::run_server_quit },
    TestDef { name: "tcp_bw", client: sock::run_client_tcp_bw, server: sock::run_server_tcp_bw },
    TestDef { name: "tcp_lat", client: sock::run_client_tcp_lat, server: sock::run_server_tcp_lat },
    TestDef { name: "udp_bw", client: sock::run_client_udp_bw, server: sock::run_server_udp_bw },
    TestDef { name: "udp_lat", client: sock::run_client_udp_lat, server: sock::run_server_udp_lat },
];

pub fn find_test(name: &str) -> Option<usize> {
    TESTS.iter().position(|t| t.name == name)
}

#[cfg(test)]
mod registry_tests {
    use super::*;

    #[test]
    fn lookup_by_name_returns_the_table_position() {
        assert_eq!(find_test("conf"), Some(0));
        assert_eq!(find_test("tcp_bw"), Some(2));
        assert_eq!(find_test("udp_lat"), Some(5));
        assert_eq!(find_test("rc_rdma_write_bw"), None);
    }
}
