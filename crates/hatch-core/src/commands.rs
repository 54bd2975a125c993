#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

pub trait HideWindow {
    fn hide_window(&mut self) -> &mut Self;
}

impl HideWindow for tokio::process::Command {
    #[cfg(windows)]
    fn hide_window(&mut self) -> &mut Self {
        self.creation_flags(CREATE_NO_WINDOW)
    }

    #[cfg(not(windows))]
    fn hide_window(&mut self) -> &mut Self {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::HideWindow;

    #[test]
    fn tokio_command_hide_window_is_chainable() {
        let mut cmd = tokio::process::Command::new("echo");
        let before = &mut cmd as *mut tokio::process::Command;
        let after = cmd.hide_window() as *mut tokio::process::Command;
        assert_eq!(before, after);
    }
}
