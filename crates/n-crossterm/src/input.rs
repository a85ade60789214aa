// SPDX-License-Identifier: MIT
//
// crossterm events back to the raw input stream.
//
// crossterm parses terminal input into structured events. The backend
// contract hands out raw code points, so keys and mouse reports are encoded
// again as the bytes an xterm-compatible terminal would have sent: control
// characters, ESC-prefixed Alt, CSI/SS3 for special keys, SGR (1006) for
// mouse. Pastes pass through verbatim.

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use n_term::reader::{self, StopFlag};
use n_term::{InputQueue, ResizeSlot};

/// Bytes for `key`, or an empty string for keys with no classic encoding
/// (media keys, modifier-only presses).
#[must_use]
pub fn encode_key(key: &KeyEvent) -> String {
    let mut out = String::new();
    if key.modifiers.contains(KeyModifiers::ALT) {
        out.push('\x1b');
    }

    match key.code {
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            out.push(control_char(c).unwrap_or(c));
        }
        KeyCode::Char(c) => out.push(c),
        KeyCode::Enter => out.push('\r'),
        KeyCode::Tab => out.push('\t'),
        KeyCode::BackTab => out.push_str("\x1b[Z"),
        KeyCode::Backspace => out.push('\x7f'),
        KeyCode::Esc => out.push('\x1b'),
        KeyCode::Up => out.push_str("\x1b[A"),
        KeyCode::Down => out.push_str("\x1b[B"),
        KeyCode::Right => out.push_str("\x1b[C"),
        KeyCode::Left => out.push_str("\x1b[D"),
        KeyCode::Home => out.push_str("\x1b[H"),
        KeyCode::End => out.push_str("\x1b[F"),
        KeyCode::Insert => out.push_str("\x1b[2~"),
        KeyCode::Delete => out.push_str("\x1b[3~"),
        KeyCode::PageUp => out.push_str("\x1b[5~"),
        KeyCode::PageDown => out.push_str("\x1b[6~"),
        KeyCode::F(n) => match function_key(n) {
            Some(seq) => out.push_str(seq),
            None => return String::new(),
        },
        _ => return String::new(),
    }
    out
}

/// Ctrl+`c` as a C0 control character.
const fn control_char(c: char) -> Option<char> {
    let byte = match c {
        'a'..='z' => c as u8 - b'a' + 1,
        'A'..='Z' => c as u8 - b'A' + 1,
        ' ' | '@' | '2' => 0x00,
        '[' | '3' => 0x1b,
        '\\' | '4' => 0x1c,
        ']' | '5' => 0x1d,
        '^' | '6' => 0x1e,
        '_' | '7' | '/' => 0x1f,
        '?' | '8' => 0x7f,
        _ => return None,
    };
    Some(byte as char)
}

const fn function_key(n: u8) -> Option<&'static str> {
    Some(match n {
        1 => "\x1bOP",
        2 => "\x1bOQ",
        3 => "\x1bOR",
        4 => "\x1bOS",
        5 => "\x1b[15~",
        6 => "\x1b[17~",
        7 => "\x1b[18~",
        8 => "\x1b[19~",
        9 => "\x1b[20~",
        10 => "\x1b[21~",
        11 => "\x1b[23~",
        12 => "\x1b[24~",
        _ => return None,
    })
}

/// SGR (1006) report for `mouse`: `CSI < Cb ; Cx ; Cy M|m`, 1-based.
#[must_use]
pub fn encode_mouse(mouse: &MouseEvent) -> String {
    let (code, release) = match mouse.kind {
        MouseEventKind::Down(button) => (button_code(button), false),
        MouseEventKind::Up(button) => (button_code(button), true),
        MouseEventKind::Drag(button) => (button_code(button) + 32, false),
        MouseEventKind::Moved => (35, false),
        MouseEventKind::ScrollUp => (64, false),
        MouseEventKind::ScrollDown => (65, false),
        MouseEventKind::ScrollLeft => (66, false),
        MouseEventKind::ScrollRight => (67, false),
    };

    let mut modifiers = 0;
    if mouse.modifiers.contains(KeyModifiers::SHIFT) {
        modifiers += 4;
    }
    if mouse.modifiers.contains(KeyModifiers::ALT) {
        modifiers += 8;
    }
    if mouse.modifiers.contains(KeyModifiers::CONTROL) {
        modifiers += 16;
    }

    format!(
        "\x1b[<{};{};{}{}",
        code + modifiers,
        u32::from(mouse.column) + 1,
        u32::from(mouse.row) + 1,
        if release { 'm' } else { 'M' }
    )
}

const fn button_code(button: MouseButton) -> u32 {
    match button {
        MouseButton::Left => 0,
        MouseButton::Middle => 1,
        MouseButton::Right => 2,
    }
}

/// Route one event: keys, mouse and pastes to the queue, resizes to the slot.
pub(crate) fn dispatch(event: Event, queue: &InputQueue, resize: &ResizeSlot) {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => {
            queue.extend(encode_key(&key).chars());
        }
        Event::Mouse(mouse) => queue.extend(encode_mouse(&mouse).chars()),
        Event::Paste(text) => queue.extend(text.chars()),
        Event::Resize(..) => resize.notify(),
        _ => {}
    }
}

/// Reader thread body.
pub(crate) fn event_loop(queue: &InputQueue, resize: &ResizeSlot, stop: &StopFlag) {
    let _closer = queue.close_on_drop();
    while !stop.is_set() {
        match event::poll(reader::POLL_INTERVAL) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "crossterm event poll failed");
                break;
            }
        }
        match event::read() {
            Ok(event) => dispatch(event, queue, resize),
            Err(e) => {
                tracing::warn!(error = %e, "crossterm event read failed");
                break;
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
