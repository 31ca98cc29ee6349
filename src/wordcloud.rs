use crate::utils::word_frequencies;

const PALETTE: [&str; 6] = ["#440154", "#3b528b", "#21918c", "#5ec962", "#2a788e", "#7a0177"];

/// Approximate advance width of one glyph, as a fraction of the font size.
const GLYPH_WIDTH: f32 = 0.6;

#[derive(Debug, Clone)]
pub struct WordCloud {
    pub width: u32,
    pub height: u32,
    pub background_color: String,
    pub max_words: usize,
    pub min_font_size: f32,
    pub max_font_size: f32,
    pub margin: f32,
}

impl Default for WordCloud {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
            background_color: "white".to_string(),
            max_words: 200,
            min_font_size: 10.0,
            max_font_size: 80.0,
            margin: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub word: String,
    pub count: usize,
    pub font_size: f32,
    pub x: f32,
    pub y: f32,
}

impl WordCloud {
    /// Lays out the most frequent words of `text` in rows, largest first.
    ///
    /// Words that do not fit in the remaining space are dropped.
    pub fn layout(&self, text: &str) -> Vec<PlacedWord> {
        let frequencies = word_frequencies(text);
        let Some(max_count) = frequencies.first().map(|(_, count)| *count) else {
            return Vec::new();
        };

        let width = self.width as f32;
        let height = self.height as f32;
        let mut placed = Vec::new();
        let mut cursor_x = self.margin;
        let mut row_top = self.margin;
        let mut row_height: f32 = 0.0;

        for (word, count) in frequencies.into_iter().take(self.max_words) {
            let weight = count as f32 / max_count as f32;
            let mut font_size = self.min_font_size + (self.max_font_size - self.min_font_size) * weight;
            let max_fit = (width - 2.0 * self.margin) / (word.chars().count() as f32 * GLYPH_WIDTH);
            font_size = font_size.min(max_fit);
            if font_size < self.min_font_size {
                continue;
            }

            let word_width = word.chars().count() as f32 * font_size * GLYPH_WIDTH;
            if cursor_x + word_width > width - self.margin {
                cursor_x = self.margin;
                row_top += row_height + self.margin;
                row_height = 0.0;
            }
            if row_top + font_size > height - self.margin {
                break;
            }

            placed.push(PlacedWord {
                word,
                count,
                font_size,
                x: cursor_x,
                y: row_top + font_size,
            });
            cursor_x += word_width + self.margin;
            row_height = row_height.max(font_size);
        }

        placed
    }

    /// Renders `text` as an SVG document.
    pub fn to_svg(&self, text: &str) -> String {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        svg.push('\n');
        svg.push_str(&format!(
            "  <rect width=\"100%\" height=\"100%\" fill=\"{}\"/>\n",
            escape(&self.background_color)
        ));
        for (rank, word) in self.layout(text).iter().enumerate() {
            svg.push_str(&format!(
                "  <text x=\"{:.1}\" y=\"{:.1}\" font-family=\"sans-serif\" font-size=\"{:.1}\" fill=\"{}\" data-count=\"{}\">{}</text>\n",
                word.x,
                word.y,
                word.font_size,
                PALETTE[rank % PALETTE.len()],
                word.count,
                escape(&word.word)
            ));
        }
        svg.push_str("</svg>\n");
        svg
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
