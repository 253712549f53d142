use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemplateScene {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub prompt_fragment: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemplateStyle {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub prompt_fragment: &'static str,
}

pub const SCENES: &[TemplateScene] = &[
    TemplateScene {
        id: "crib",
        name: "婴儿床时光",
        description: "温馨的晨间唤醒时刻",
        prompt_fragment: "baby lying in a cozy white crib with soft bedding, morning sunlight",
    },
    TemplateScene {
        id: "window",
        name: "飘窗小坐",
        description: "午后阳光下的静谧",
        prompt_fragment: "baby sitting on a bay window with sheer curtains, natural lighting, cozy cushion",
    },
    TemplateScene {
        id: "parent",
        name: "亲子互动",
        description: "充满爱意的互动瞬间",
        prompt_fragment: "close up of baby holding a parent's finger, warm and emotional atmosphere",
    },
    TemplateScene {
        id: "carpet",
        name: "客厅爬爬垫",
        description: "活泼玩耍的日常",
        prompt_fragment: "baby crawling on a colorful play mat in a bright living room, happy expression",
    },
    TemplateScene {
        id: "park",
        name: "公园草坪",
        description: "清新自然的户外感",
        prompt_fragment: "baby sitting on green grass in a park, soft bokeh background, natural light",
    },
    TemplateScene {
        id: "flowers",
        name: "小区花丛",
        description: "花团锦簇的梦幻",
        prompt_fragment: "baby surrounded by colorful flowers in a garden, soft focus, dreamy",
    },
    TemplateScene {
        id: "beach",
        name: "沙滩玩沙",
        description: "海边度假风",
        prompt_fragment: "baby playing with sand on a sunny beach, blue ocean in background",
    },
    TemplateScene {
        id: "autumn",
        name: "秋日落叶",
        description: "金黄色的秋天童话",
        prompt_fragment: "baby sitting among golden autumn leaves, warm tone, soft sweater",
    },
    TemplateScene {
        id: "fullmoon",
        name: "满月纪念",
        description: "传统与现代结合的纪念",
        prompt_fragment: "baby in a celebratory setup for 1-month milestone, festive decorations",
    },
    TemplateScene {
        id: "birthday",
        name: "周岁生日",
        description: "生日派对的欢乐",
        prompt_fragment: "baby with a birthday cake, balloons in background, party hat, cheerful",
    },
];

pub const STYLES: &[TemplateStyle] = &[
    TemplateStyle {
        id: "cream",
        name: "软萌奶油风",
        description: "色彩明亮柔和，软糯显可爱",
        prompt_fragment: "creamy pastel colors, soft lighting, high key, cute and fluffy aesthetic",
    },
    TemplateStyle {
        id: "film",
        name: "复古胶片风",
        description: "暖调颗粒感，怀旧质感",
        prompt_fragment: "vintage film look, grain, warm tones, nostalgic atmosphere",
    },
    TemplateStyle {
        id: "fresh",
        name: "简约清新风",
        description: "低饱和干净，突出主体",
        prompt_fragment: "minimalist, clean background, low saturation, fresh and airy",
    },
    TemplateStyle {
        id: "dreamy",
        name: "童话梦幻风",
        description: "童趣元素，梦境般美好",
        prompt_fragment: "fairytale style, magical elements, dreamy soft focus, fantasy vibe",
    },
    TemplateStyle {
        id: "salt",
        name: "日系盐系风",
        description: "自然光影，生活气息",
        prompt_fragment: "Japanese salt style, natural light, candid feel, clean and simple",
    },
];

pub fn find_scene(id: &str) -> Option<&'static TemplateScene> {
    SCENES.iter().find(|scene| scene.id == id)
}

pub fn find_style(id: &str) -> Option<&'static TemplateStyle> {
    STYLES.iter().find(|style| style.id == id)
}

/// The scene/style pair a batch is generated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateSelection {
    pub scene: &'static TemplateScene,
    pub style: &'static TemplateStyle,
}

impl Default for TemplateSelection {
    fn default() -> Self {
        Self {
            scene: &SCENES[0],
            style: &STYLES[0],
        }
    }
}

impl TemplateSelection {
    pub fn new(scene: &'static TemplateScene, style: &'static TemplateStyle) -> Self {
        Self { scene, style }
    }

    /// Looks both ids up in the catalog. `Err` carries the id that did not match.
    pub fn from_ids(scene_id: &str, style_id: &str) -> Result<Self, UnknownTemplate> {
        let scene =
            find_scene(scene_id).ok_or_else(|| UnknownTemplate::Scene(scene_id.to_string()))?;
        let style =
            find_style(style_id).ok_or_else(|| UnknownTemplate::Style(style_id.to_string()))?;
        Ok(Self { scene, style })
    }

    /// Label stored on every generated photo, e.g. "婴儿床时光 软萌奶油风".
    pub fn template_name(&self) -> String {
        format!("{} {}", self.scene.name, self.style.name)
    }

    pub fn prompt(&self) -> String {
        format!(
            "A professional portrait of the baby in the reference photo, {}. Style: {}. \
             Keep the baby's facial features faithful to the reference.",
            self.scene.prompt_fragment, self.style.prompt_fragment
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnknownTemplate {
    #[error("Unknown scene: {0}")]
    Scene(String),
    #[error("Unknown style: {0}")]
    Style(String),
}
