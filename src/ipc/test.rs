//! Testes de Comunicação entre Processos (IPC)
//!
//! # Por que testar?
//! Pipes e sockets são o único canal entre processos. Um byte perdido, um EOF
//! falso ou um accept que deixa meio peer-link montado quebram todo mundo que
//! fala por cima deles.
//!
//! Cobertura:
//! - pipe: entrega em ordem, EOF, `BrokenPipe`, escrita maior que o ring,
//!   escrita parcial quando o leitor some
//! - socket: porta única por Listener, accepts em FIFO, timeout de connect,
//!   accept sem fid livre, Listener fechado, shutdown e eco bidirecional,
//!   accept de processo morto não instala fid no novo dono do pid

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::core::kernel::{syscall, Kernel};
use crate::ipc::socket::{accept_waiters, pending_requests, ShutdownMode};
use crate::sched::config::KernelConfig;
use crate::syscall::*;
use crate::sys::error::SysError;
use crate::sys::types::{Fid, Pid, Port, WaitTarget};

fn boot(config: KernelConfig, init: fn(&[u8]) -> i32) -> i32 {
    Kernel::boot(config, init, &[]).expect("boot")
}

fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "condição nunca ficou verdadeira");
        thread::sleep(Duration::from_millis(1));
    }
}

fn fid_at(args: &[u8], at: usize) -> Fid {
    Fid::new(args[at] as u32)
}

fn queued(listener: Fid) -> usize {
    syscall(|ctx, guard| pending_requests(&guard, ctx.pid, listener)).expect("pending")
}

/// Lê até EOF.
fn read_to_end(fid: Fid) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 32];
    loop {
        match sys_read(fid, &mut buf).expect("read") {
            0 => return out,
            n => out.extend_from_slice(&buf[..n]),
        }
    }
}

fn read_exact(fid: Fid, n: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 32];
    while out.len() < n {
        let got = sys_read(fid, &mut buf[..n - out.len()]).expect("read");
        assert!(got > 0, "EOF antes da hora");
        out.extend_from_slice(&buf[..got]);
    }
    out
}

/// Conecta o socket `args[0]` à porta `args[1]`, sem prazo.
fn connect_socket(args: &[u8]) -> i32 {
    match sys_connect(fid_at(args, 0), args[1] as Port, None) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

/// Cria um socket, conecta à porta `args[0]` e escreve `args[1]`.
fn connect_and_say(args: &[u8]) -> i32 {
    let fid = sys_socket(0).expect("socket");
    sys_connect(fid, args[0] as Port, None).expect("connect");
    sys_write(fid, &args[1..2]).expect("write");
    0
}

/// Listener em `port` mais um par conectado: (listener, servidor, cliente).
fn connected_pair(port: Port) -> (Fid, Fid, Fid) {
    let listener = sys_socket(port).expect("socket");
    sys_listen(listener).expect("listen");
    let client = sys_socket(0).expect("socket");
    sys_create_thread(connect_socket, &[client.as_u32() as u8, port as u8]).expect("thread");
    let server = sys_accept(listener).expect("accept");
    (listener, server, client)
}

// =============================================================================
// PIPES
// =============================================================================

#[test]
fn pipe_delivers_bytes_then_eof() {
    fn init(_: &[u8]) -> i32 {
        let p = sys_pipe().unwrap();
        assert_eq!(sys_write(p.write, b"hello"), Ok(5));
        sys_close(p.write).unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(sys_read(p.read, &mut buf), Ok(5));
        assert_eq!(&buf[..5], b"hello");
        assert_eq!(sys_read(p.read, &mut buf), Ok(0));
        0
    }
    assert_eq!(boot(KernelConfig::default(), init), 0);
}

#[test]
fn pipe_ends_reject_the_wrong_direction() {
    fn init(_: &[u8]) -> i32 {
        let p = sys_pipe().unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(sys_read(p.write, &mut buf), Err(SysError::HandleTypeMismatch));
        assert_eq!(sys_write(p.read, b"x"), Err(SysError::HandleTypeMismatch));
        0
    }
    assert_eq!(boot(KernelConfig::default(), init), 0);
}

#[test]
fn write_without_reader_is_broken_pipe() {
    fn init(_: &[u8]) -> i32 {
        let p = sys_pipe().unwrap();
        sys_close(p.read).unwrap();
        assert_eq!(sys_write(p.write, b"x"), Err(SysError::BrokenPipe));
        // Fid fechado não resolve mais.
        let mut buf = [0u8; 1];
        assert_eq!(sys_read(p.read, &mut buf), Err(SysError::BadHandle));
        0
    }
    assert_eq!(boot(KernelConfig::default(), init), 0);
}

#[test]
fn write_larger_than_ring_blocks_until_drained() {
    /// Escreve 0..200 no fid `args[0]` e fecha.
    fn writer(args: &[u8]) -> i32 {
        let data: Vec<u8> = (0..200u8).collect();
        let written = sys_write(fid_at(args, 0), &data);
        let _ = sys_close(fid_at(args, 0));
        (written == Ok(200)) as i32
    }
    fn init(_: &[u8]) -> i32 {
        let p = sys_pipe().unwrap();
        sys_create_thread(writer, &[p.write.as_u32() as u8]).unwrap();
        let got = read_to_end(p.read);
        assert_eq!(got, (0..200u8).collect::<Vec<_>>());
        0
    }
    let config = KernelConfig {
        pipe_buffer_size: 16,
        ..KernelConfig::default()
    };
    assert_eq!(boot(config, init), 0);
}

static PARTIAL_WRITE: AtomicUsize = AtomicUsize::new(usize::MAX);

#[test]
fn reader_closing_mid_write_returns_partial_count() {
    fn writer(args: &[u8]) -> i32 {
        let data = [0xABu8; 100];
        let result = sys_write(fid_at(args, 0), &data);
        PARTIAL_WRITE.store(result.unwrap_or(0), Ordering::SeqCst);
        0
    }
    fn init(_: &[u8]) -> i32 {
        let p = sys_pipe().unwrap();
        sys_create_thread(writer, &[p.write.as_u32() as u8]).unwrap();
        assert_eq!(read_exact(p.read, 4), vec![0xAB; 4]);
        sys_close(p.read).unwrap();

        wait_until(|| PARTIAL_WRITE.load(Ordering::SeqCst) != usize::MAX);
        let written = PARTIAL_WRITE.load(Ordering::SeqCst);
        assert!((16..=20).contains(&written), "escreveu {}", written);
        0
    }
    let config = KernelConfig {
        pipe_buffer_size: 16,
        ..KernelConfig::default()
    };
    assert_eq!(boot(config, init), 0);
}

#[test]
fn pipe_storage_is_freed_when_both_ends_close() {
    fn open_pipes() -> usize {
        syscall(|_ctx, guard| Ok(guard.pipes.len())).expect("pipes")
    }
    fn init(_: &[u8]) -> i32 {
        let before = open_pipes();
        let p = sys_pipe().unwrap();
        assert_eq!(open_pipes(), before + 1);
        sys_close(p.write).unwrap();
        assert_eq!(open_pipes(), before + 1);
        sys_close(p.read).unwrap();
        assert_eq!(open_pipes(), before);
        0
    }
    assert_eq!(boot(KernelConfig::default(), init), 0);
}

// =============================================================================
// SOCKETS
// =============================================================================

#[test]
fn second_listener_on_a_port_is_rejected() {
    fn init(_: &[u8]) -> i32 {
        let first = sys_socket(10).unwrap();
        sys_listen(first).unwrap();
        let second = sys_socket(10).unwrap();
        assert_eq!(sys_listen(second), Err(SysError::PortInUse));
        assert_eq!(sys_listen(first), Err(SysError::ProtocolViolation));

        // O primeiro continua atendendo.
        sys_create_thread(connect_and_say, &[10, b'k']).unwrap();
        let peer = sys_accept(first).unwrap();
        assert_eq!(read_exact(peer, 1), b"k".to_vec());
        0
    }
    assert_eq!(boot(KernelConfig::default(), init), 0);
}

#[test]
fn socket_arguments_are_validated() {
    fn init(_: &[u8]) -> i32 {
        assert_eq!(sys_socket(2000), Err(SysError::InvalidArgument));

        let unbound = sys_socket(0).unwrap();
        assert_eq!(sys_listen(unbound), Err(SysError::ProtocolViolation));
        assert_eq!(sys_accept(unbound), Err(SysError::ProtocolViolation));
        assert_eq!(sys_connect(unbound, 1024, None), Err(SysError::InvalidArgument));
        assert_eq!(sys_connect(unbound, 77, None), Err(SysError::ProtocolViolation));

        let mut buf = [0u8; 1];
        assert_eq!(sys_read(unbound, &mut buf), Err(SysError::NotConnected));
        assert_eq!(sys_write(unbound, b"x"), Err(SysError::NotConnected));

        let p = sys_pipe().unwrap();
        assert_eq!(sys_listen(p.read), Err(SysError::HandleTypeMismatch));
        0
    }
    assert_eq!(boot(KernelConfig::default(), init), 0);
}

#[test]
fn accepts_are_served_in_request_order() {
    fn init(_: &[u8]) -> i32 {
        let listener = sys_socket(20).unwrap();
        sys_listen(listener).unwrap();

        sys_create_thread(connect_and_say, &[20, b'A']).unwrap();
        wait_until(|| queued(listener) == 1);
        sys_create_thread(connect_and_say, &[20, b'B']).unwrap();
        wait_until(|| queued(listener) == 2);

        let first = sys_accept(listener).unwrap();
        let second = sys_accept(listener).unwrap();
        assert_eq!(read_exact(first, 1), b"A".to_vec());
        assert_eq!(read_exact(second, 1), b"B".to_vec());
        assert_eq!(queued(listener), 0);
        0
    }
    assert_eq!(boot(KernelConfig::default(), init), 0);
}

#[test]
fn connect_timeout_withdraws_the_request() {
    fn init(_: &[u8]) -> i32 {
        let listener = sys_socket(30).unwrap();
        sys_listen(listener).unwrap();
        let client = sys_socket(0).unwrap();

        let timeout = Some(Duration::from_millis(20));
        assert_eq!(sys_connect(client, 30, timeout), Err(SysError::TimedOut));
        assert_eq!(queued(listener), 0);

        // O socket volta a ser utilizável.
        assert_eq!(sys_connect(client, 30, timeout), Err(SysError::TimedOut));
        assert_eq!(queued(listener), 0);
        0
    }
    assert_eq!(boot(KernelConfig::default(), init), 0);
}

#[test]
fn accept_without_free_fid_keeps_the_request() {
    fn init(_: &[u8]) -> i32 {
        let listener = sys_socket(40).unwrap();
        sys_listen(listener).unwrap();
        sys_create_thread(connect_and_say, &[40, b'z']).unwrap();
        wait_until(|| queued(listener) == 1);

        // Listener + socket do conector + este enchem a tabela.
        let filler = sys_socket(0).unwrap();
        assert_eq!(sys_accept(listener), Err(SysError::HandleTableFull));
        assert_eq!(queued(listener), 1);

        sys_close(filler).unwrap();
        let peer = sys_accept(listener).unwrap();
        assert_eq!(read_exact(peer, 1), b"z".to_vec());
        0
    }
    let config = KernelConfig {
        max_fileid: 3,
        ..KernelConfig::default()
    };
    assert_eq!(boot(config, init), 0);
}

#[test]
fn closing_listener_refuses_queued_connects() {
    /// Conecta à porta `args[0]` e reporta o erro no fid `args[1]`.
    fn refused_reporter(args: &[u8]) -> i32 {
        let fid = sys_socket(0).expect("socket");
        let byte = match sys_connect(fid, args[0] as Port, None) {
            Err(SysError::ConnectionRefused) => b'R',
            _ => b'?',
        };
        sys_write(fid_at(args, 1), &[byte]).expect("write");
        0
    }
    fn init(_: &[u8]) -> i32 {
        let results = sys_pipe().unwrap();
        let listener = sys_socket(50).unwrap();
        sys_listen(listener).unwrap();
        sys_create_thread(refused_reporter, &[50, results.write.as_u32() as u8]).unwrap();
        wait_until(|| queued(listener) == 1);

        sys_close(listener).unwrap();
        assert_eq!(read_exact(results.read, 1), b"R".to_vec());

        // Porta livre de novo.
        let again = sys_socket(50).unwrap();
        assert_eq!(sys_listen(again), Ok(()));
        0
    }
    assert_eq!(boot(KernelConfig::default(), init), 0);
}

#[test]
fn shutdown_write_gives_peer_eof() {
    fn init(_: &[u8]) -> i32 {
        let (listener, server, client) = connected_pair(60);

        sys_shutdown(client, ShutdownMode::WRITE).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(sys_read(server, &mut buf), Ok(0));
        assert_eq!(sys_write(client, b"x"), Err(SysError::BrokenPipe));

        // A outra direção segue de pé.
        assert_eq!(sys_write(server, b"up"), Ok(2));
        assert_eq!(read_exact(client, 2), b"up".to_vec());

        assert_eq!(sys_shutdown(listener, ShutdownMode::BOTH), Err(SysError::NotConnected));
        let unbound = sys_socket(0).unwrap();
        assert_eq!(sys_shutdown(unbound, ShutdownMode::READ), Err(SysError::NotConnected));
        0
    }
    assert_eq!(boot(KernelConfig::default(), init), 0);
}

#[test]
fn peers_talk_both_ways_until_one_closes() {
    fn init(_: &[u8]) -> i32 {
        let (_listener, server, client) = connected_pair(70);

        assert_eq!(sys_write(client, b"ping"), Ok(4));
        assert_eq!(read_exact(server, 4), b"ping".to_vec());
        assert_eq!(sys_write(server, b"pong"), Ok(4));
        assert_eq!(read_exact(client, 4), b"pong".to_vec());

        sys_close(client).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(sys_read(server, &mut buf), Ok(0));
        assert_eq!(sys_write(server, b"x"), Err(SysError::BrokenPipe));
        0
    }
    assert_eq!(boot(KernelConfig::default(), init), 0);
}

#[test]
fn connected_sockets_cannot_listen_or_connect_again() {
    fn init(_: &[u8]) -> i32 {
        let (_listener, server, client) = connected_pair(80);
        assert_eq!(sys_listen(server), Err(SysError::ProtocolViolation));
        assert_eq!(sys_connect(client, 80, None), Err(SysError::ProtocolViolation));
        0
    }
    assert_eq!(boot(KernelConfig::default(), init), 0);
}

#[test]
fn shutdown_read_breaks_both_directions_into_the_closed_end() {
    fn init(_: &[u8]) -> i32 {
        let (_listener, server, client) = connected_pair(85);
        assert_eq!(sys_write(client, b"lost"), Ok(4));

        sys_shutdown(server, ShutdownMode::READ).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(sys_read(server, &mut buf), Err(SysError::BrokenPipe));
        assert_eq!(sys_write(client, b"x"), Err(SysError::BrokenPipe));

        // A ponta de escrita do servidor continua aberta.
        assert_eq!(sys_write(server, b"ok"), Ok(2));
        assert_eq!(read_exact(client, 2), b"ok".to_vec());
        0
    }
    assert_eq!(boot(KernelConfig::default(), init), 0);
}

/// Resultado do accept da thread que sobreviveu ao próprio processo.
/// 0 = ainda não voltou, 1 = `InvalidOperation`, 2 = fid, 3 = outro erro.
static ORPHAN_ACCEPT: AtomicU8 = AtomicU8::new(0);

#[test]
fn accept_of_an_exited_process_does_not_touch_the_pid_reuser() {
    const PORT: Port = 90;

    /// Espera `args[0]` ficar legível e conecta à porta, com prazo curto.
    fn late_connector(args: &[u8]) -> i32 {
        read_exact(fid_at(args, 0), 1);
        let fid = sys_socket(0).expect("socket");
        match sys_connect(fid, PORT, Some(Duration::from_millis(50))) {
            Err(SysError::TimedOut) => 0,
            _ => 1,
        }
    }
    fn accepter(args: &[u8]) -> i32 {
        let code = match sys_accept(fid_at(args, 0)) {
            Err(SysError::InvalidOperation) => 1,
            Ok(_) => 2,
            Err(_) => 3,
        };
        ORPHAN_ACCEPT.store(code, Ordering::SeqCst);
        0
    }
    /// Listener compartilhado com um filho; uma thread fica presa em accept
    /// e o processo sai por baixo dela.
    fn listener_owner(args: &[u8]) -> i32 {
        let listener = sys_socket(PORT).expect("socket");
        sys_listen(listener).expect("listen");
        sys_spawn(late_connector, args).expect("spawn");
        sys_create_thread(accepter, &[listener.as_u32() as u8]).expect("thread");
        wait_until(|| {
            syscall(|ctx, guard| accept_waiters(&guard, ctx.pid, listener)).expect("waiters") == 1
        });
        0
    }
    fn idle_until_released(args: &[u8]) -> i32 {
        read_exact(fid_at(args, 0), 1);
        0
    }
    fn open_fids(pid: Pid) -> usize {
        syscall(|_, guard| Ok(guard.procs.get(pid).map(|pcb| pcb.fidt.open_count())))
            .expect("procs")
            .expect("pid vivo")
    }

    fn init(_: &[u8]) -> i32 {
        let go = sys_pipe().unwrap();
        let hold = sys_pipe().unwrap();

        let owner = sys_spawn(listener_owner, &[go.read.as_u32() as u8]).unwrap();
        assert_eq!(sys_wait_child(WaitTarget::Child(owner)), Ok((owner, 0)));
        assert_eq!(ORPHAN_ACCEPT.load(Ordering::SeqCst), 0);

        let reuser = sys_spawn(idle_until_released, &[hold.read.as_u32() as u8]).unwrap();
        assert_eq!(reuser, owner);
        let before = open_fids(reuser);

        // O conector acorda o accepter órfão.
        sys_write(go.write, b"g").unwrap();
        wait_until(|| ORPHAN_ACCEPT.load(Ordering::SeqCst) != 0);
        assert_eq!(ORPHAN_ACCEPT.load(Ordering::SeqCst), 1);
        assert_eq!(open_fids(reuser), before);

        sys_write(hold.write, b"r").unwrap();
        assert_eq!(sys_wait_child(WaitTarget::Child(reuser)), Ok((reuser, 0)));
        // O conector (órfão, agora filho de init) desistiu por prazo.
        let (_, status) = sys_wait_child(WaitTarget::Any).unwrap();
        assert_eq!(status, 0);
        0
    }
    assert_eq!(boot(KernelConfig::default(), init), 0);
}
