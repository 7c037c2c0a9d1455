//! Shipped vocabulary data set.
//!
//! Each room is `(category key, English label, items)` and each item is
//! `(chinese, english, base name)`. Room order here is the order returned by
//! `WordBank::categories()`.

pub type RawItem = (&'static str, &'static str, &'static str);

pub type RawCategory = (&'static str, &'static str, &'static [RawItem]);

pub const LIVING_ROOM: &[RawItem] = &[
    ("沙發", "Sofa", "sofa"),
    ("電視", "TV", "tv"),
    ("桌子", "Table", "table"),
    ("椅子", "Chair", "chair"),
    ("燈", "Light", "light"),
];

pub const BEDROOM: &[RawItem] = &[
    ("床", "Bed", "bed"),
    ("枕頭", "Pillow", "pillow"),
    ("衣櫃", "Closet", "closet"),
    ("冷氣", "AC", "ac"),
    ("玩具", "Toy", "toy"),
];

pub const KITCHEN: &[RawItem] = &[
    ("冰箱", "Fridge", "fridge"),
    ("水槽", "Sink", "sink"),
    ("瓦斯爐", "Stove", "stove"),
];

// "sink" also appears in the kitchen; the same object can live in two rooms.
pub const BATHROOM: &[RawItem] = &[
    ("馬桶", "Toilet", "toilet"),
    ("浴缸", "Bathtub", "bathtub"),
    ("水槽", "Sink", "sink"),
    ("鏡子", "Mirror", "mirror"),
    ("淋浴", "Shower", "shower"),
];

pub const CATEGORIES: &[RawCategory] = &[
    ("客廳", "Living Room", LIVING_ROOM),
    ("臥室", "Bedroom", BEDROOM),
    ("廚房", "Kitchen", KITCHEN),
    ("浴室", "Bathroom", BATHROOM),
];
