//! Status line of a running batch: `desc [===>   ] (done/total) running, names`

const MIN_BAR_WIDTH: usize = 20;
const NAME_SEP: &str = ", ";
const NAME_OMIT: &str = ", ...";

/// Progress state, fed by worker events
pub struct Tracker {
    desc: String,
    names: Vec<String>,
    /// Indexes of running tasks, in start order
    running: Vec<usize>,
    done: usize,
}

impl Tracker {
    pub fn new(desc: &str, names: Vec<String>) -> Self {
        Self {
            desc: desc.to_string(),
            names,
            running: Vec::new(),
            done: 0,
        }
    }

    pub fn start(&mut self, index: usize) {
        self.running.push(index);
    }

    pub fn finish(&mut self, index: usize) {
        self.running.retain(|i| *i != index);
        self.done += 1;
    }

    pub fn name(&self, index: usize) -> &str {
        self.names.get(index).map(String::as_str).unwrap_or_default()
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn total(&self) -> usize {
        self.names.len()
    }

    /// Fit the line into `width` columns
    ///
    /// Parts are added left to right and each only when it fits, so running
    /// names go first, then the counter, then the bar. A width smaller than
    /// the description gives a line of dots.
    pub fn render(&self, width: usize) -> String {
        let desc_width = self.desc.chars().count();
        if desc_width > width {
            return ".".repeat(width);
        }
        let mut line = self.desc.clone();
        let mut used = desc_width;

        let bar_width = if width <= MIN_BAR_WIDTH { 0 } else { width / 4 };
        if bar_width == 0 {
            return line;
        }
        let bar = format!(" {}", self.render_bar(bar_width));
        if used + bar.chars().count() > width {
            return line;
        }
        used += bar.chars().count();
        line.push_str(&bar);

        let total = self.total().to_string();
        let tag = format!(" ({:>pad$}/{})", self.done, total, pad = total.len());
        if used + tag.len() > width {
            return line;
        }
        used += tag.len();
        line.push_str(&tag);

        if self.running.is_empty() || used + 1 > width {
            return line;
        }
        line.push(' ');
        used += 1;

        for (i, index) in self.running.iter().enumerate() {
            let name = self.name(*index);
            let piece = if i == 0 {
                name.to_string()
            } else {
                format!("{}{}", NAME_SEP, name)
            };
            let piece_width = piece.chars().count();
            if used + piece_width <= width {
                line.push_str(&piece);
                used += piece_width;
                continue;
            }

            let omit = if i == 0 { "..." } else { NAME_OMIT };
            if used + omit.len() <= width {
                line.push_str(omit);
            } else {
                line.push_str(&".".repeat(width - used));
            }
            break;
        }

        line
    }

    fn render_bar(&self, width: usize) -> String {
        let total = self.total().max(1);
        let filled = width * self.done / total;
        let bar = if filled >= width {
            "=".repeat(width)
        } else {
            format!("{}>{}", "=".repeat(filled), " ".repeat(width - filled - 1))
        };
        format!("[{}]", bar)
    }
}
