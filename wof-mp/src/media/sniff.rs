//! Payload sniffing by magic bytes
//!
//! Feed payloads carry no reliable type information, so the first bytes
//! decide whether a card holds a still image (poster path, never pooled) or
//! a media container worth probing.

/// Media container formats the pool will try to prepare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// ISO base media with an ftyp box (MP4, M4V, QuickTime MOV)
    Mp4,
    /// Matroska / WebM
    Matroska,
    Ogg,
    Wav,
    Flac,
    Mp3,
    /// ADTS AAC stream
    Aac,
}

impl ContainerFormat {
    /// File extension used for the temp artifact and the probe hint
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Matroska => "mkv",
            ContainerFormat::Ogg => "ogg",
            ContainerFormat::Wav => "wav",
            ContainerFormat::Flac => "flac",
            ContainerFormat::Mp3 => "mp3",
            ContainerFormat::Aac => "aac",
        }
    }
}

/// Still image formats seen in outfit payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Heic,
}

/// Result of sniffing a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Image(ImageFormat),
    Container(ContainerFormat),
    Unknown,
}

/// ISO-BMFF brands that denote still images rather than video
const IMAGE_BRANDS: &[&[u8; 4]] = &[
    b"heic", b"heix", b"heim", b"heis", b"mif1", b"msf1", b"avif",
];

/// Classify a payload by its leading bytes
pub fn sniff(bytes: &[u8]) -> PayloadKind {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return PayloadKind::Image(ImageFormat::Jpeg);
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return PayloadKind::Image(ImageFormat::Png);
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return PayloadKind::Image(ImageFormat::Gif);
    }
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") {
        match &bytes[8..12] {
            b"WEBP" => return PayloadKind::Image(ImageFormat::Webp),
            b"WAVE" => return PayloadKind::Container(ContainerFormat::Wav),
            _ => return PayloadKind::Unknown,
        }
    }
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        let brand = &bytes[8..12];
        if IMAGE_BRANDS.iter().any(|b| &b[..] == brand) {
            return PayloadKind::Image(ImageFormat::Heic);
        }
        return PayloadKind::Container(ContainerFormat::Mp4);
    }
    // ISO media without a leading ftyp (bare moov/mdat) is not readable by
    // the isomp4 backend and falls through to Unknown
    if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return PayloadKind::Container(ContainerFormat::Matroska);
    }
    if bytes.starts_with(b"OggS") {
        return PayloadKind::Container(ContainerFormat::Ogg);
    }
    if bytes.starts_with(b"fLaC") {
        return PayloadKind::Container(ContainerFormat::Flac);
    }
    if bytes.starts_with(b"ID3") {
        return PayloadKind::Container(ContainerFormat::Mp3);
    }
    if bytes.len() >= 2 && bytes[0] == 0xFF {
        if bytes[1] & 0xF6 == 0xF0 {
            return PayloadKind::Container(ContainerFormat::Aac);
        }
        if bytes[1] & 0xE0 == 0xE0 {
            return PayloadKind::Container(ContainerFormat::Mp3);
        }
    }
    PayloadKind::Unknown
}
