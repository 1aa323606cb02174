use indicatif::{ProgressBar, ProgressStyle};

/// Displays a progress bar while traces are being captured to show the user how many elements are
/// left.
pub(crate) struct CaptureProgress {
    bar: Option<ProgressBar>,
}

impl CaptureProgress {
    pub(crate) fn start(total_elements: usize, enabled: bool) -> Self {
        if !enabled {
            return Self { bar: None };
        }

        let bar = ProgressBar::new(total_elements as u64);
        match ProgressStyle::with_template(
            "{spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} elements {msg}",
        ) {
            Ok(style) => bar.set_style(style.progress_chars("#>-")),
            Err(e) => log::debug!("Falling back to the default progress style: {e}"),
        }

        Self { bar: Some(bar) }
    }

    pub(crate) fn element_done(&self, element_id: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(element_id.to_string());
            bar.inc(1);
        }
    }

    pub(crate) fn finish(&self) {
        if let Some(bar) = &self.bar {
            log::trace!("Capture progress finished");
            bar.finish_and_clear();
        }
    }
}

impl Drop for CaptureProgress {
    fn drop(&mut self) {
        if let Some(bar) = &self.bar {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}
