use crate::scene::Placement;
use cogex_core::ImageRef;
use tiny_skia::Pixmap;

pub const CANVAS_ID: &str = "cogex-animation-canvas";
pub const STIMULUS_CLASS: &str = "cogex-animation-stimulus";
pub const SCENE_ID: &str = "cogex-scene";

/// What currently occupies the stimulus slot
#[derive(Debug, Clone, PartialEq)]
pub enum StimulusView {
    /// Offscreen buffer the frames are painted into
    Canvas(Pixmap),
    /// Image shown directly by reference
    Image(ImageRef),
}

/// The display element handed to a running trial.
///
/// It holds a stimulus slot, a prompt, and a free-form body. Setting the body
/// replaces everything else, the way assigning an element's inner markup
/// would. Every mutation bumps [`revision`](Self::revision) so presenters can
/// tell when to repaint.
#[derive(Debug, Clone)]
pub struct Mount {
    width: u32,
    height: u32,
    stimulus: Option<StimulusView>,
    prompt: Option<String>,
    body: Option<String>,
    scene: Option<(u32, u32, Vec<Placement>)>,
    revision: u64,
}

impl Mount {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            stimulus: None,
            prompt: None,
            body: None,
            scene: None,
            revision: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.touch();
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_empty(&self) -> bool {
        self.stimulus.is_none()
            && self.prompt.is_none()
            && self.body.is_none()
            && self.scene.is_none()
    }

    pub fn stimulus(&self) -> Option<&StimulusView> {
        self.stimulus.as_ref()
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Width and height of the scene grid, if one is shown
    pub fn scene_size(&self) -> Option<(u32, u32)> {
        self.scene.as_ref().map(|(w, h, _)| (*w, *h))
    }

    pub fn placements(&self) -> &[Placement] {
        self.scene.as_ref().map_or(&[], |(_, _, p)| p.as_slice())
    }

    /// Canvas of at least the given size, created or replaced as needed
    pub fn canvas_mut(&mut self, width: u32, height: u32) -> Option<&mut Pixmap> {
        let fits = matches!(
            &self.stimulus,
            Some(StimulusView::Canvas(pm)) if pm.width() == width && pm.height() == height
        );
        if !fits {
            self.stimulus = Some(StimulusView::Canvas(Pixmap::new(width, height)?));
        }
        self.touch();
        match &mut self.stimulus {
            Some(StimulusView::Canvas(pm)) => Some(pm),
            _ => None,
        }
    }

    pub fn canvas(&self) -> Option<&Pixmap> {
        match &self.stimulus {
            Some(StimulusView::Canvas(pm)) => Some(pm),
            _ => None,
        }
    }

    pub fn set_image(&mut self, image: ImageRef) {
        self.stimulus = Some(StimulusView::Image(image));
        self.touch();
    }

    pub fn remove_stimulus(&mut self) {
        if self.stimulus.take().is_some() {
            self.touch();
        }
    }

    /// Shows the prompt; repeated calls with the same text are no-ops
    pub fn set_prompt(&mut self, prompt: &str) {
        if self.prompt.as_deref() != Some(prompt) {
            self.prompt = Some(prompt.to_string());
            self.touch();
        }
    }

    /// Replaces the whole content with `markup`
    pub fn set_body(&mut self, markup: impl Into<String>) {
        let markup = markup.into();
        if self.body.as_deref() == Some(markup.as_str())
            && self.stimulus.is_none()
            && self.prompt.is_none()
            && self.scene.is_none()
        {
            return;
        }
        self.stimulus = None;
        self.prompt = None;
        self.scene = None;
        self.body = Some(markup);
        self.touch();
    }

    /// Replaces the whole content with an absolutely positioned image grid
    pub fn set_scene(&mut self, width: u32, height: u32, placements: Vec<Placement>) {
        self.stimulus = None;
        self.prompt = None;
        self.body = None;
        self.scene = Some((width, height, placements));
        self.touch();
    }

    pub fn clear(&mut self) {
        if !self.is_empty() {
            self.stimulus = None;
            self.prompt = None;
            self.body = None;
            self.scene = None;
            self.touch();
        }
    }

    /// Inner markup of the element as a web host would render it
    pub fn markup(&self) -> String {
        let mut out = String::new();
        match &self.stimulus {
            Some(StimulusView::Canvas(pm)) => out.push_str(&format!(
                r#"<canvas id="{CANVAS_ID}" width="{}" height="{}"></canvas>"#,
                pm.width(),
                pm.height()
            )),
            Some(StimulusView::Image(img)) => out.push_str(&format!(
                r#"<img src="{}" class="{STIMULUS_CLASS}">"#,
                escape_attr(img.as_str())
            )),
            None => {}
        }
        if let Some(prompt) = &self.prompt {
            out.push_str(prompt);
        }
        if let Some((width, height, placements)) = &self.scene {
            out.push_str(&format!(
                r#"<div id="{SCENE_ID}" style="position: relative; width: {width}px; height: {height}px;">"#
            ));
            for p in placements {
                out.push_str(&p.markup());
            }
            out.push_str("</div>");
        }
        if let Some(body) = &self.body {
            out.push_str(body);
        }
        out
    }

    /// Visible text of the prompt and body, tags stripped
    pub fn text_content(&self) -> String {
        let mut parts = Vec::new();
        if let Some(prompt) = &self.prompt {
            parts.push(strip_tags(prompt));
        }
        if let Some(body) = &self.body {
            parts.push(strip_tags(body));
        }
        parts.retain(|p| !p.is_empty());
        parts.join("\n")
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

pub(crate) fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Drops tags, turns block boundaries into line breaks and decodes the common
/// entities. Good enough for prompt and feedback snippets, not a parser.
fn strip_tags(markup: &str) -> String {
    let mut text = String::with_capacity(markup.len());
    let mut tag = String::new();
    let mut in_tag = false;
    for ch in markup.chars() {
        match (in_tag, ch) {
            (false, '<') => {
                in_tag = true;
                tag.clear();
            }
            (true, '>') => {
                in_tag = false;
                let name = tag
                    .trim_start_matches('/')
                    .split(|c: char| c.is_whitespace() || c == '/')
                    .next()
                    .unwrap_or("")
                    .to_ascii_lowercase();
                if matches!(name.as_str(), "br" | "p" | "div" | "li") && !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            (true, c) => tag.push(c),
            (false, c) => text.push(c),
        }
    }
    let decoded = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");
    decoded
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
