use std::fmt::Write;

/// Format `bytes` as hexdump lines, 16 bytes each, offsets relative to the
/// start of the dump.
///
/// ```text
/// 0x000: 48 65 6C 6C 6F 20 57 6F  72 6C 64 00 00 00 00 00  |Hello World.....|
/// ```
pub fn hexdump_lines(bytes: &[u8], ascii: bool) -> Vec<String> {
    bytes
        .chunks(16)
        .enumerate()
        .map(|(i, chunk)| format_line(i * 16, chunk, ascii))
        .collect()
}

fn format_line(offset: usize, chunk: &[u8], ascii: bool) -> String {
    let mut line = String::with_capacity(80);
    let _ = write!(line, "0x{:03X}: ", offset);

    for j in 0..16 {
        if j == 8 {
            line.push(' ');
        }
        match chunk.get(j) {
            Some(byte) => {
                let _ = write!(line, "{:02X} ", byte);
            }
            None => line.push_str("   "),
        }
    }

    if ascii {
        line.push_str(" |");
        for byte in chunk {
            line.push(if (0x20..0x7F).contains(byte) { *byte as char } else { '.' });
        }
        for _ in chunk.len()..16 {
            line.push(' ');
        }
        line.push('|');
    }
    line
}
