use serde::Serialize;

/// Outbound message as accepted by the LINE push API.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LineMessage {
    Text {
        text: String,
    },
    Location {
        title: String,
        address: String,
        latitude: f64,
        longitude: f64,
    },
    Flex {
        #[serde(rename = "altText")]
        alt_text: String,
        contents: FlexContainer,
    },
    Template {
        #[serde(rename = "altText")]
        alt_text: String,
        template: Template,
    },
}

impl LineMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn location(
        title: impl Into<String>,
        address: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self::Location { title: title.into(), address: address.into(), latitude, longitude }
    }

    pub fn flex(alt_text: impl Into<String>, contents: FlexContainer) -> Self {
        Self::Flex { alt_text: alt_text.into(), contents }
    }

    pub fn carousel(alt_text: impl Into<String>, carousel: CarouselTemplate) -> Self {
        Self::Template { alt_text: alt_text.into(), template: Template::Carousel(carousel) }
    }

    /// The text body, for plain text messages only.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Location { .. } => "location",
            Self::Flex { .. } => "flex",
            Self::Template { .. } => "template",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlexContainer {
    /// `body` is always a vertical [`FlexComponent::Box`].
    Bubble { body: FlexComponent },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxLayout {
    Vertical,
    Horizontal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FlexBox {
    pub layout: BoxLayout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<Spacing>,
    pub contents: Vec<FlexComponent>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Spacing {
    Sm,
    Md,
    Lg,
    Xl,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FontSize {
    Sm,
    Md,
    Lg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Start,
    Center,
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Link,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlexComponent {
    Text(FlexText),
    Button {
        style: ButtonStyle,
        action: Action,
        #[serde(skip_serializing_if = "Option::is_none")]
        margin: Option<Spacing>,
    },
    Separator {
        #[serde(skip_serializing_if = "Option::is_none")]
        margin: Option<Spacing>,
    },
    Box(FlexBox),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FlexText {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<FontSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<FontWeight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<Spacing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl FlexText {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), size: None, weight: None, align: None, margin: None, color: None }
    }

    pub fn size(mut self, size: FontSize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn bold(mut self) -> Self {
        self.weight = Some(FontWeight::Bold);
        self
    }

    pub fn centered(mut self) -> Self {
        self.align = Some(Align::Center);
        self
    }

    pub fn margin(mut self, margin: Spacing) -> Self {
        self.margin = Some(margin);
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

impl From<FlexText> for FlexComponent {
    fn from(text: FlexText) -> Self {
        Self::Text(text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Message { label: String, text: String },
    Uri { label: String, uri: String },
}

impl Action {
    /// A button that sends its own label back as a message.
    pub fn echo(label: impl Into<String>) -> Self {
        let label = label.into();
        Self::Message { text: label.clone(), label }
    }

    pub fn uri(label: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::Uri { label: label.into(), uri: uri.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Template {
    Carousel(CarouselTemplate),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselTemplate {
    pub columns: Vec<CarouselColumn>,
    pub image_aspect_ratio: String,
    pub image_size: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselColumn {
    pub thumbnail_image_url: String,
    pub image_background_color: String,
    pub title: String,
    pub text: String,
    pub default_action: Action,
    pub actions: Vec<Action>,
}

/// Builds a single vertical bubble body.
pub struct BubbleBuilder {
    contents: Vec<FlexComponent>,
}

impl BubbleBuilder {
    pub fn new() -> Self {
        Self { contents: Vec::new() }
    }

    pub fn text(mut self, text: FlexText) -> Self {
        self.contents.push(text.into());
        self
    }

    pub fn button(mut self, action: Action, margin: Spacing) -> Self {
        self.contents.push(FlexComponent::Button {
            style: ButtonStyle::Primary,
            action,
            margin: Some(margin),
        });
        self
    }

    pub fn separator(mut self, margin: Spacing) -> Self {
        self.contents.push(FlexComponent::Separator { margin: Some(margin) });
        self
    }

    pub fn nested<F>(mut self, margin: Spacing, build: F) -> Self
    where
        F: FnOnce(BubbleBuilder) -> BubbleBuilder,
    {
        let inner = build(BubbleBuilder::new());
        self.contents.push(FlexComponent::Box(FlexBox {
            layout: BoxLayout::Vertical,
            margin: Some(margin),
            contents: inner.contents,
        }));
        self
    }

    pub fn build(self) -> FlexContainer {
        FlexContainer::Bubble {
            body: FlexComponent::Box(FlexBox {
                layout: BoxLayout::Vertical,
                margin: None,
                contents: self.contents,
            }),
        }
    }
}

impl Default for BubbleBuilder {
    fn default() -> Self {
        Self::new()
    }
}
