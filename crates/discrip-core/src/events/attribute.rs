//! Item attribute identifiers used by `CINFO`, `TINFO` and `SINFO` lines.

use std::fmt;

use serde::{Serialize, Serializer};

/// How the raw value of an attribute is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Duration,
    Text,
}

macro_rules! item_attributes {
    ($($variant:ident = $id:literal),+ $(,)?) => {
        /// Semantic slot identified by the numeric id of an info line.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u8)]
        pub enum ItemAttribute {
            $($variant = $id),+
        }

        impl ItemAttribute {
            /// Every known attribute, in id order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Look up an attribute by its protocol id.
            pub const fn from_id(id: u32) -> Option<Self> {
                match id {
                    $($id => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Name used as the key in disc summaries.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),+
                }
            }
        }
    };
}

item_attributes! {
    Unknown = 0,
    Type = 1,
    Name = 2,
    LangCode = 3,
    LangName = 4,
    CodecId = 5,
    CodecShort = 6,
    CodecLong = 7,
    ChapterCount = 8,
    Duration = 9,
    DiskSize = 10,
    DiskSizeBytes = 11,
    StreamTypeExtension = 12,
    Bitrate = 13,
    AudioChannelsCount = 14,
    AngleInfo = 15,
    SourceFileName = 16,
    AudioSampleRate = 17,
    AudioSampleSize = 18,
    VideoSize = 19,
    VideoAspectRatio = 20,
    VideoFrameRate = 21,
    StreamFlags = 22,
    DateTime = 23,
    OriginalTitleId = 24,
    SegmentsCount = 25,
    SegmentsMap = 26,
    OutputFileName = 27,
    MetadataLanguageCode = 28,
    MetadataLanguageName = 29,
    TreeInfo = 30,
    PanelTitle = 31,
    VolumeName = 32,
    OrderWeight = 33,
    OutputFormat = 34,
    OutputFormatDescription = 35,
    SeamlessInfo = 36,
    PanelText = 37,
    MkvFlags = 38,
    MkvFlagsText = 39,
    AudioChannelLayoutName = 40,
    OutputCodecShort = 41,
    OutputConversionType = 42,
    OutputAudioSampleRate = 43,
    OutputAudioSampleSize = 44,
    OutputAudioChannelsCount = 45,
    OutputAudioChannelLayoutName = 46,
    OutputAudioChannelLayout = 47,
    OutputAudioMixDescription = 48,
    Comment = 49,
    OffsetSequenceId = 50,
}

impl ItemAttribute {
    /// Protocol id of this attribute.
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Coercion applied to values carrying this attribute.
    pub const fn value_kind(self) -> ValueKind {
        match self {
            Self::OrderWeight
            | Self::SegmentsCount
            | Self::DiskSizeBytes
            | Self::AudioChannelsCount
            | Self::AudioSampleRate
            | Self::AudioSampleSize
            | Self::StreamFlags
            | Self::ChapterCount => ValueKind::Integer,
            Self::Duration => ValueKind::Duration,
            _ => ValueKind::Text,
        }
    }
}

impl fmt::Display for ItemAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ItemAttribute {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
