use crate::color::Hsl;

pub const PALETTE_COUNT: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteId {
    RainbowSnake,
    ThirtyDegreeQuad,
    QuadBubbles,
    Mermaid,
    Lava,
    Lori,
    Starfield,
    BlueAndGreen,
    CandyCane,
    Protons,
    Megarainbow,
    NightSky,
    RedAndBlack,
    PrimaryMale,
    MoviePoster,
    PinotNoir,
}

impl PaletteId {
    pub const ALL: [PaletteId; PALETTE_COUNT] = [
        Self::RainbowSnake,
        Self::ThirtyDegreeQuad,
        Self::QuadBubbles,
        Self::Mermaid,
        Self::Lava,
        Self::Lori,
        Self::Starfield,
        Self::BlueAndGreen,
        Self::CandyCane,
        Self::Protons,
        Self::Megarainbow,
        Self::NightSky,
        Self::RedAndBlack,
        Self::PrimaryMale,
        Self::MoviePoster,
        Self::PinotNoir,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::RainbowSnake => "rainbow snake",
            Self::ThirtyDegreeQuad => "30 degree quad",
            Self::QuadBubbles => "quad bubbles",
            Self::Mermaid => "mermaid",
            Self::Lava => "lava",
            Self::Lori => "lori",
            Self::Starfield => "starfield",
            Self::BlueAndGreen => "blue and green",
            Self::CandyCane => "candy cane",
            Self::Protons => "protons",
            Self::Megarainbow => "megarainbow",
            Self::NightSky => "night sky",
            Self::RedAndBlack => "red and black",
            Self::PrimaryMale => "primary male",
            Self::MoviePoster => "movie poster",
            Self::PinotNoir => "pinot noir",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let want = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|id| id.name() == want)
    }
}

/// Ordered, immutable color sequence produced by [`generate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    id: PaletteId,
    colors: Vec<Hsl>,
}

impl Palette {
    pub fn id(&self) -> PaletteId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    pub fn colors(&self) -> &[Hsl] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn get(&self, idx: usize) -> Hsl {
        self.colors[idx]
    }

    /// Entry at `offset` treating the palette as a ring; any offset is valid.
    pub fn cyclic(&self, offset: i64) -> Hsl {
        self.colors[ring_index(offset, self.colors.len())]
    }

    pub fn random(&self, rng: &mut fastrand::Rng) -> Hsl {
        self.colors[rng.usize(..self.colors.len())]
    }

    /// Uniform pick among non-black entries; `None` when every entry is black.
    pub fn random_non_black(&self, rng: &mut fastrand::Rng) -> Option<Hsl> {
        let lit = self.colors.iter().filter(|c| !c.is_black()).count();
        if lit == 0 {
            return None;
        }
        self.colors
            .iter()
            .filter(|c| !c.is_black())
            .nth(rng.usize(..lit))
            .copied()
    }
}

/// Index into a ring of `len` entries; `len` must be non-zero.
pub fn ring_index(offset: i64, len: usize) -> usize {
    offset.rem_euclid(len as i64) as usize
}

/// Palette registry: closed set of names and their generators.
pub trait PaletteRegistry {
    fn names(&self) -> &[PaletteId];
    fn generate(&self, id: PaletteId, rng: &mut fastrand::Rng) -> Palette;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinPalettes;

impl PaletteRegistry for BuiltinPalettes {
    fn names(&self) -> &[PaletteId] {
        &PaletteId::ALL
    }

    fn generate(&self, id: PaletteId, rng: &mut fastrand::Rng) -> Palette {
        generate(id, rng)
    }
}

/// Palette memoized by an animation mode between resets.
#[derive(Debug, Clone)]
pub struct PaletteCache {
    current: Palette,
}

impl PaletteCache {
    pub fn new(rng: &mut fastrand::Rng) -> Self {
        Self {
            current: Self::pick(rng),
        }
    }

    pub fn reselect(&mut self, rng: &mut fastrand::Rng) {
        self.current = Self::pick(rng);
    }

    pub fn set(&mut self, palette: Palette) {
        self.current = palette;
    }

    pub fn get(&self) -> &Palette {
        &self.current
    }

    fn pick(rng: &mut fastrand::Rng) -> Palette {
        let registry = BuiltinPalettes;
        let names = registry.names();
        let id = names[rng.usize(..names.len())];
        registry.generate(id, rng)
    }
}

/// Builds the color list for `id`. Hue-parameterised palettes draw their
/// offset from `rng`.
pub fn generate(id: PaletteId, rng: &mut fastrand::Rng) -> Palette {
    let mut colors = match id {
        PaletteId::RainbowSnake => {
            let x = rng.f32();
            let gap = [2usize, 3, 4, 1000][rng.usize(..4)];
            rainbow_snake(x, gap)
        }
        PaletteId::ThirtyDegreeQuad => thirty_degree_quad(rng.f32()),
        PaletteId::QuadBubbles => quad_bubbles(rng.f32()),
        PaletteId::Mermaid => mermaid(),
        PaletteId::Lava => table(LAVA),
        PaletteId::Lori => lori(),
        PaletteId::Starfield => starfield(),
        PaletteId::BlueAndGreen => blue_and_green(),
        PaletteId::CandyCane => candy_cane(),
        PaletteId::Protons => protons(),
        PaletteId::Megarainbow => megarainbow(),
        PaletteId::NightSky => night_sky(),
        PaletteId::RedAndBlack => red_and_black(),
        PaletteId::PrimaryMale => primary_male(),
        PaletteId::MoviePoster => movie_poster(),
        PaletteId::PinotNoir => pinot_noir(),
    };
    for c in &mut colors {
        c.h = c.h.rem_euclid(1.0);
    }
    Palette { id, colors }
}

const LAVA: &[(f32, f32, f32)] = &[
    (0.0, 1.0, 0.5),
    (0.0, 1.0, 0.125),
    (0.0, 1.0, 0.05),
    (0.0, 1.0, 0.025),
    (0.0, 0.0, 0.0),
    (0.09, 1.0, 0.5),
    (0.09, 1.0, 0.66),
    (0.04, 1.0, 0.5),
];

const LORI_BANDS: [[(f32, f32, f32); 6]; 4] = [
    [(0.75, 1.0, 0.125), (0.75, 1.0, 0.0625), (0.0, 1.0, 0.1333), (0.0, 1.0, 0.125), (0.0, 1.0, 0.0625), (0.66, 1.0, 0.15)],
    [(0.75, 1.0, 0.5), (0.75, 1.0, 0.25), (0.0, 1.0, 0.66), (0.0, 1.0, 0.5), (0.0, 1.0, 0.25), (0.66, 1.0, 0.75)],
    [(0.75, 1.0, 0.25), (0.75, 1.0, 0.125), (0.0, 1.0, 0.33), (0.0, 1.0, 0.25), (0.0, 1.0, 0.125), (0.66, 1.0, 0.375)],
    [(0.75, 1.0, 0.5), (0.75, 1.0, 0.25), (0.0, 1.0, 0.66), (0.0, 1.0, 0.5), (0.0, 1.0, 0.25), (0.66, 1.0, 0.75)],
];

const NIGHT_BLUE: [(f32, f32); 15] = [
    (0.64, 0.0125),
    (0.65, 0.025),
    (0.66, 0.05),
    (0.67, 0.1),
    (0.68, 0.2),
    (0.69, 0.3),
    (0.70, 0.4),
    (0.71, 0.5),
    (0.70, 0.4),
    (0.69, 0.3),
    (0.68, 0.2),
    (0.67, 0.1),
    (0.66, 0.05),
    (0.65, 0.025),
    (0.64, 0.0125),
];

const ONE_SIXTH: f32 = 1.0 / 6.0;
const ONE_THIRD: f32 = 1.0 / 3.0;
const TWO_THIRDS: f32 = 2.0 / 3.0;

fn table(rows: &[(f32, f32, f32)]) -> Vec<Hsl> {
    rows.iter().map(|&(h, s, l)| Hsl::new(h, s, l)).collect()
}

fn black(out: &mut Vec<Hsl>, n: usize) {
    out.extend(std::iter::repeat_n(Hsl::BLACK, n));
}

fn ramp(out: &mut Vec<Hsl>, h: f32, s: f32, ls: &[f32]) {
    out.extend(ls.iter().map(|&l| Hsl::new(h, s, l)));
}

fn rainbow_snake(x: f32, gap: usize) -> Vec<Hsl> {
    (0..175usize)
        .map(|y| {
            let step = y as f32 * 0.005;
            let l = if y % gap != 0 { (0.6 - step).max(0.0) } else { 0.0 };
            Hsl::new(x + step, 1.0, l)
        })
        .collect()
}

fn thirty_degree_quad(x: f32) -> Vec<Hsl> {
    let accent = x + 1.0 / 12.0;
    let mut v = Vec::with_capacity(38);
    ramp(&mut v, x, 1.0, &[0.05, 0.1, 0.25, 0.5, 0.75, 0.5, 0.25, 0.1, 0.05]);
    black(&mut v, 5);
    ramp(&mut v, accent, 1.0, &[0.25, 0.25]);
    black(&mut v, 5);
    ramp(&mut v, x + 0.5, 1.0, &[0.0625, 0.125, 0.25, 0.125, 0.0625]);
    black(&mut v, 5);
    ramp(&mut v, accent, 1.0, &[0.25, 0.25]);
    black(&mut v, 5);
    v
}

fn quad_bubbles(x: f32) -> Vec<Hsl> {
    const BUBBLE: [f32; 9] = [0.0625, 0.125, 0.25, 0.5, 0.75, 0.5, 0.25, 0.125, 0.0625];
    const SPECK: [f32; 3] = [0.133333, 0.25, 0.133333];
    let mut v = Vec::with_capacity(52);
    ramp(&mut v, x, 1.0, &BUBBLE);
    black(&mut v, 7);
    ramp(&mut v, x + 0.25, 0.25, &SPECK);
    black(&mut v, 7);
    ramp(&mut v, x + 0.5, 0.5, &BUBBLE);
    black(&mut v, 7);
    ramp(&mut v, x + 0.75, 0.25, &SPECK);
    black(&mut v, 7);
    v
}

fn mermaid() -> Vec<Hsl> {
    let mut v = Vec::with_capacity(32);
    for l in [0.03125, 0.0625, 0.125, 0.25, 0.5, 0.25, 0.125, 0.0625] {
        for h in [0.5, 0.66, 0.7, 0.66] {
            v.push(Hsl::new(h, 1.0, l));
        }
    }
    v
}

fn lori() -> Vec<Hsl> {
    let mut v = Vec::with_capacity(32);
    for band in LORI_BANDS {
        black(&mut v, 2);
        v.extend(table(&band));
    }
    v
}

fn starfield() -> Vec<Hsl> {
    let mut v = Vec::with_capacity(20);
    black(&mut v, 15);
    v.push(Hsl::new(ONE_SIXTH, 1.0, 0.7));
    v.push(Hsl::new(ONE_SIXTH, 0.0, 0.75));
    v.push(Hsl::new(TWO_THIRDS, 1.0, 0.7));
    black(&mut v, 1);
    v.push(Hsl::new(TWO_THIRDS, 1.0, 0.2));
    v
}

fn blue_and_green() -> Vec<Hsl> {
    let mut v = Vec::with_capacity(14);
    black(&mut v, 4);
    ramp(&mut v, TWO_THIRDS, 1.0, &[0.5, 0.25, 0.0125]);
    black(&mut v, 4);
    ramp(&mut v, ONE_THIRD, 1.0, &[0.5, 0.125, 0.05]);
    v
}

fn candy_cane() -> Vec<Hsl> {
    let mut v = Vec::with_capacity(18);
    black(&mut v, 4);
    ramp(&mut v, 0.0, 1.0, &[0.05, 0.5]);
    ramp(&mut v, 0.0, 0.0, &[1.0, 0.05]);
    black(&mut v, 10);
    v
}

fn protons() -> Vec<Hsl> {
    let mut v = Vec::with_capacity(30);
    ramp(&mut v, TWO_THIRDS, 1.0, &[0.66, 0.5]);
    black(&mut v, 13);
    ramp(&mut v, TWO_THIRDS, 1.0, &[1.0, 1.0]);
    black(&mut v, 13);
    v
}

fn megarainbow() -> Vec<Hsl> {
    const BANDS: [(f32, f32); 7] = [
        (0.0, 0.5),
        (0.035, 0.5),
        (0.09, 0.5),
        (ONE_THIRD, 0.5),
        (0.6, 0.5),
        (0.72, 0.5),
        (0.8, 0.4),
    ];
    let mut v = Vec::with_capacity(77);
    for (h, l) in BANDS {
        black(&mut v, 10);
        v.push(Hsl::new(h, 1.0, l));
    }
    v
}

fn night_sky() -> Vec<Hsl> {
    let mut v = Vec::with_capacity(76);
    ramp(&mut v, 0.16666, 1.0, &[0.2, 0.75, 0.2]);
    black(&mut v, 10);
    v.extend(NIGHT_BLUE.iter().map(|&(h, l)| Hsl::new(h, 1.0, l)));
    black(&mut v, 10);
    ramp(&mut v, 0.0, 1.0, &[0.2, 0.75, 0.2]);
    black(&mut v, 10);
    v.extend(NIGHT_BLUE.iter().map(|&(h, l)| Hsl::new(h, 1.0, l)));
    black(&mut v, 10);
    v
}

fn red_and_black() -> Vec<Hsl> {
    let mut v = Vec::with_capacity(13);
    ramp(&mut v, 0.0, 1.0, &[0.0125, 0.5, 0.5, 0.0125]);
    black(&mut v, 9);
    v
}

fn primary_male() -> Vec<Hsl> {
    let mut v = Vec::with_capacity(66);
    for h in [0.0, 0.09, 0.6] {
        let c = Hsl::new(h, 1.0, 0.5);
        v.push(c);
        black(&mut v, 2);
        v.push(c);
        black(&mut v, 2);
        v.push(c);
        black(&mut v, 15);
    }
    v
}

fn movie_poster() -> Vec<Hsl> {
    let mut v = Vec::with_capacity(40);
    ramp(&mut v, 0.7125, 1.0, &[0.05, 0.15, 0.25, 0.35, 0.45, 0.5]);
    for (h, l) in [(0.07, 0.5), (0.075, 0.4), (0.08, 0.3), (0.085, 0.2), (0.09, 0.1)] {
        v.push(Hsl::new(h, 1.0, l));
    }
    for (h, l) in [(0.09, 0.1), (0.085, 0.2), (0.08, 0.3), (0.075, 0.4), (0.07, 0.5)] {
        v.push(Hsl::new(h, 1.0, l));
    }
    ramp(&mut v, 0.7125, 1.0, &[0.45, 0.35, 0.25, 0.15, 0.05]);
    black(&mut v, 19);
    v
}

fn pinot_noir() -> Vec<Hsl> {
    const SWELL: [f32; 5] = [0.125, 0.25, 0.5, 0.25, 0.125];
    let mut v = Vec::with_capacity(21);
    black(&mut v, 4);
    ramp(&mut v, 0.055, 1.0, &[0.0625, 0.0625, 0.0625]);
    ramp(&mut v, 0.0, 1.0, &SWELL);
    ramp(&mut v, 0.95, 1.0, &SWELL);
    black(&mut v, 4);
    v
}
