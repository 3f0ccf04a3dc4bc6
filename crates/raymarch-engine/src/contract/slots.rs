use std::fmt;

/// Bind group every contract slot lives in.
pub const BIND_GROUP: u32 = 0;

/// Image slots.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ImageSlot {
    Output,
}

/// Structured-buffer slots.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferSlot {
    Shapes,
    Camera,
    Light,
}

impl BufferSlot {
    pub const COUNT: usize = 3;
    pub const ALL: [BufferSlot; Self::COUNT] = [Self::Shapes, Self::Camera, Self::Light];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Shapes => 0,
            Self::Camera => 1,
            Self::Light => 2,
        }
    }
}

/// Every binding of the kernel contract.
///
/// The parameter block is a single uniform binding; individual scalars are
/// addressed with `ParamSlot`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Slot {
    Image(ImageSlot),
    Buffer(BufferSlot),
    Params,
}

impl Slot {
    pub const ALL: [Slot; 5] = [
        Slot::Image(ImageSlot::Output),
        Slot::Buffer(BufferSlot::Shapes),
        Slot::Buffer(BufferSlot::Camera),
        Slot::Buffer(BufferSlot::Light),
        Slot::Params,
    ];

    /// Binding index within `BIND_GROUP`.
    pub const fn binding(self) -> u32 {
        match self {
            Slot::Image(ImageSlot::Output) => 0,
            Slot::Buffer(BufferSlot::Shapes) => 1,
            Slot::Buffer(BufferSlot::Camera) => 2,
            Slot::Buffer(BufferSlot::Light) => 3,
            Slot::Params => 4,
        }
    }

    /// Kernel-side variable name.
    pub const fn name(self) -> &'static str {
        match self {
            Slot::Image(ImageSlot::Output) => "output",
            Slot::Buffer(BufferSlot::Shapes) => "shapes",
            Slot::Buffer(BufferSlot::Camera) => "camera",
            Slot::Buffer(BufferSlot::Light) => "light",
            Slot::Params => "params",
        }
    }

    pub fn from_binding(binding: u32) -> Option<Slot> {
        Slot::ALL.into_iter().find(|s| s.binding() == binding)
    }

    const fn bit(self) -> u8 {
        1 << self.binding()
    }
}

impl From<ImageSlot> for Slot {
    fn from(slot: ImageSlot) -> Self {
        Slot::Image(slot)
    }
}

impl From<BufferSlot> for Slot {
    fn from(slot: BufferSlot) -> Self {
        Slot::Buffer(slot)
    }
}

/// Small set of slots, used for "declared by the kernel" and "bound by the host".
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct SlotSet(u8);

impl SlotSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Slots a configuration binds: the core four, plus the light record when
    /// lighting is enabled.
    pub fn required(lighting: bool) -> Self {
        let mut set: SlotSet = [
            Slot::Image(ImageSlot::Output),
            Slot::Buffer(BufferSlot::Shapes),
            Slot::Buffer(BufferSlot::Camera),
            Slot::Params,
        ]
        .into_iter()
        .collect();
        if lighting {
            set.insert(Slot::Buffer(BufferSlot::Light));
        }
        set
    }

    #[inline]
    pub fn insert(&mut self, slot: impl Into<Slot>) {
        self.0 |= slot.into().bit();
    }

    #[inline]
    pub fn contains(self, slot: impl Into<Slot>) -> bool {
        self.0 & slot.into().bit() != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Slot> {
        Slot::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl FromIterator<Slot> for SlotSet {
    fn from_iter<I: IntoIterator<Item = Slot>>(iter: I) -> Self {
        let mut set = SlotSet::empty();
        for slot in iter {
            set.insert(slot);
        }
        set
    }
}

impl fmt::Debug for SlotSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Slot::name)).finish()
    }
}
