//! Line-oriented console channel.
//!
//! Lines starting with `/` are commands; `#n` presses the n-th button printed
//! so far. Option sets print as a title followed by `[#n] label` rows. End of
//! input disconnects the channel.

use std::io::{BufRead, BufReader, Stdin, Stdout, Write};

use super::{ChannelError, ChannelResult, InboundEvent, MessagingChannel, OptionButton};

#[derive(Debug)]
struct RenderedButton {
    set: usize,
    button: OptionButton,
    live: bool,
}

#[derive(Debug)]
pub struct ConsoleChannel<R, W> {
    input: R,
    output: W,
    titles: Vec<String>,
    buttons: Vec<RenderedButton>,
    last_pressed: Option<usize>,
    connected: bool,
}

impl ConsoleChannel<BufReader<Stdin>, Stdout> {
    /// Channel over the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleChannel<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            titles: Vec::new(),
            buttons: Vec::new(),
            last_pressed: None,
            connected: true,
        }
    }

    /// Give back the writer, e.g. to inspect what was printed.
    pub fn into_output(self) -> W {
        self.output
    }

    fn write_line(&mut self, line: &str) -> ChannelResult<()> {
        writeln!(self.output, "{line}")
            .and_then(|()| self.output.flush())
            .map_err(|e| ChannelError::Transport {
                message: format!("console write failed: {e}"),
            })
    }

    fn press(&mut self, raw: &str) -> ChannelResult<Option<InboundEvent>> {
        let index = raw
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .filter(|&i| self.buttons.get(i).is_some_and(|b| b.live));
        let Some(index) = index else {
            self.write_line(&format!("no live button #{raw}"))?;
            return Ok(None);
        };
        self.last_pressed = Some(index);
        let rendered = &self.buttons[index];
        Ok(Some(InboundEvent::callback(
            self.titles[rendered.set].clone(),
            rendered.button.payload.clone(),
        )))
    }
}

impl<R, W> MessagingChannel for ConsoleChannel<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn send_text(&mut self, text: &str) -> ChannelResult<()> {
        self.write_line(text)
    }

    fn send_options(&mut self, title: &str, options: &[OptionButton]) -> ChannelResult<()> {
        let set = self.titles.len();
        self.titles.push(title.to_string());
        self.write_line(title)?;
        for option in options {
            self.buttons.push(RenderedButton {
                set,
                button: option.clone(),
                live: true,
            });
            let number = self.buttons.len();
            self.write_line(&format!("  [#{number}] {}", option.label))?;
        }
        Ok(())
    }

    fn edit_last_options(&mut self, label: &str) -> ChannelResult<()> {
        let pressed = self.last_pressed.ok_or(ChannelError::NothingToEdit)?;
        let set = self.buttons[pressed].set;
        for (i, rendered) in self.buttons.iter_mut().enumerate() {
            if rendered.set == set {
                rendered.live = i == pressed;
            }
        }
        self.buttons[pressed].button.label = label.to_string();
        let title = self.titles[set].clone();
        self.write_line(&format!("{title}\n  [#{}] {label}", pressed + 1))
    }

    fn receive(&mut self) -> ChannelResult<Vec<InboundEvent>> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| ChannelError::Transport {
                message: format!("console read failed: {e}"),
            })?;
        if read == 0 {
            self.connected = false;
            return Ok(Vec::new());
        }

        let line = line.trim();
        if line.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(raw) = line.strip_prefix('#') {
            return Ok(self.press(raw.trim())?.into_iter().collect());
        }
        Ok(vec![InboundEvent::command(line)])
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn channel(input: &str) -> ConsoleChannel<Cursor<Vec<u8>>, Vec<u8>> {
        ConsoleChannel::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn printed(channel: ConsoleChannel<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(channel.into_output()).unwrap()
    }

    #[test]
    fn commands_and_eof() {
        let mut ch = channel("/update\n\n");
        assert_eq!(ch.receive().unwrap(), vec![InboundEvent::command("/update")]);
        assert!(ch.receive().unwrap().is_empty());
        assert!(ch.is_connected());
        assert!(ch.receive().unwrap().is_empty());
        assert!(!ch.is_connected());
    }

    #[test]
    fn buttons_number_across_sets() {
        let mut ch = channel("#3\n");
        ch.send_options("Ordinary deck", &[OptionButton::new("Y", "pick:2")])
            .unwrap();
        ch.send_options(
            "Priority decks",
            &[
                OptionButton::new("[Aug] Z", "pick:3"),
                OptionButton::new("[Aug] X", "pick:1"),
            ],
        )
        .unwrap();

        let events = ch.receive().unwrap();
        assert_eq!(events, vec![InboundEvent::callback("Priority decks", "pick:1")]);

        let out = printed(ch);
        assert!(out.contains("  [#1] Y"));
        assert!(out.contains("  [#3] [Aug] X"));
    }

    #[test]
    fn edit_retires_sibling_buttons() {
        let mut ch = channel("#1\n#2\n#1\n");
        ch.send_options(
            "Priority decks",
            &[OptionButton::new("A", "pick:1"), OptionButton::new("B", "pick:2")],
        )
        .unwrap();

        assert_eq!(ch.receive().unwrap().len(), 1);
        ch.edit_last_options("SUCCESSFULLY COMPLETED").unwrap();
        assert!(ch.receive().unwrap().is_empty());
        assert_eq!(
            ch.receive().unwrap(),
            vec![InboundEvent::callback("Priority decks", "pick:1")]
        );

        let out = printed(ch);
        assert!(out.contains("[#1] SUCCESSFULLY COMPLETED"));
        assert!(out.contains("no live button #2"));
    }

    #[test]
    fn edit_before_press_fails() {
        let mut ch = channel("");
        assert!(matches!(
            ch.edit_last_options("X"),
            Err(ChannelError::NothingToEdit)
        ));
    }

    #[test]
    fn unknown_button_number() {
        let mut ch = channel("#9\n#x\n");
        assert!(ch.receive().unwrap().is_empty());
        assert!(ch.receive().unwrap().is_empty());
        let out = printed(ch);
        assert!(out.contains("no live button #9"));
        assert!(out.contains("no live button #x"));
    }
}
