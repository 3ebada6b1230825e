// @generated
// Generated from: proto/misaka_signal.proto
// Manual check-in for offline builds.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MisakaSignal {
    #[prost(message, optional, tag = "1")]
    pub timestamp: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(string, tag = "2")]
    pub uuid: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub parent_uuid: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub sender_agent: ::prost::alloc::string::String,
    #[prost(enumeration = "misaka_signal::AuthorityLevel", tag = "5")]
    pub authority: i32,
    #[prost(string, tag = "6")]
    pub content_type: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "7")]
    pub payload: ::prost::alloc::vec::Vec<u8>,
}

/// Nested message and enum types in `MisakaSignal`.
pub mod misaka_signal {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum AuthorityLevel {
        Lv0 = 0,
        Lv1 = 1,
        Lv2 = 2,
        Lv3 = 3,
        Lv4 = 4,
        Lv5 = 5,
    }

    impl AuthorityLevel {
        /// String value of the enum field names used in the ProtoBuf definition.
        ///
        /// The values are not transformed in any way and thus are considered stable
        /// (if the ProtoBuf definition does not change) and safe for programmatic use.
        pub fn as_str_name(&self) -> &'static str {
            match self {
                Self::Lv0 => "LV0",
                Self::Lv1 => "LV1",
                Self::Lv2 => "LV2",
                Self::Lv3 => "LV3",
                Self::Lv4 => "LV4",
                Self::Lv5 => "LV5",
            }
        }

        /// Creates an enum from field names used in the ProtoBuf definition.
        pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
            match value {
                "LV0" => Some(Self::Lv0),
                "LV1" => Some(Self::Lv1),
                "LV2" => Some(Self::Lv2),
                "LV3" => Some(Self::Lv3),
                "LV4" => Some(Self::Lv4),
                "LV5" => Some(Self::Lv5),
                _ => None,
            }
        }
    }
}
