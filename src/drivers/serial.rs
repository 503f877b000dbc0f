//! Porta serial do host.
//!
//! Destino único de todos os logs do kernel. Fora do bare-metal a "serial" é o
//! stderr do processo hospedeiro; cada registro de log sai inteiro, sob um
//! spinlock, para que linhas de contextos diferentes não se misturem.

use spin::Mutex;

/// Serializa a emissão de registros.
static SERIAL_LOCK: Mutex<()> = Mutex::new(());

/// Converte um nibble (0-15) para ASCII hex.
#[inline]
const fn nibble_to_ascii(n: u8) -> u8 {
    if n < 10 {
        b'0' + n
    } else {
        b'a' + (n - 10)
    }
}

/// Formata `value` como `0x` + hex sem zeros à esquerda.
fn format_hex(value: u64, out: &mut Vec<u8>) {
    out.extend_from_slice(b"0x");
    if value == 0 {
        out.push(b'0');
        return;
    }
    let mut started = false;
    for shift in (0..16).rev() {
        let nibble = ((value >> (shift * 4)) & 0xF) as u8;
        if nibble != 0 || started {
            started = true;
            out.push(nibble_to_ascii(nibble));
        }
    }
}

/// Emite um registro completo: prefixo, mensagem, valor opcional e newline.
pub fn emit_record(prefix: &str, msg: &str, value: Option<u64>) {
    let mut line = Vec::with_capacity(prefix.len() + msg.len() + 20);
    line.extend_from_slice(prefix.as_bytes());
    line.extend_from_slice(msg.as_bytes());
    if let Some(v) = value {
        format_hex(v, &mut line);
    }
    line.push(b'\n');

    let _guard = SERIAL_LOCK.lock();
    // eprint! respeita a captura de saída do harness de testes.
    eprint!("{}", String::from_utf8_lossy(&line));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_from_many_contexts_are_all_emitted() {
        let workers: Vec<_> = (0..4u64)
            .map(|i| std::thread::spawn(move || emit_record("[TEST] ", "registro ", Some(i))))
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert!(!SERIAL_LOCK.is_locked());
    }

    #[test]
    fn hex_rendering_drops_leading_zeros() {
        let mut out = Vec::new();
        format_hex(0x1f, &mut out);
        assert_eq!(out, b"0x1f");

        out.clear();
        format_hex(0, &mut out);
        assert_eq!(out, b"0x0");

        out.clear();
        format_hex(u64::MAX, &mut out);
        assert_eq!(out, b"0xffffffffffffffff");
    }
}
