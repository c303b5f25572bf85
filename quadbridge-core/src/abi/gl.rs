//! Graphics enum values the bridge inspects itself.
//!
//! Everything else the guest passes (targets, blend factors, capabilities...) is
//! forwarded to the native context untouched; only the values below drive bridge
//! logic, so only they are named.

/// Graphics API constants with their reference numeric values.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum GlEnum {
    NoError = 0,

    // Error codes recorded by the bridge.
    InvalidEnum = 0x0500,
    InvalidValue = 0x0501,
    InvalidOperation = 0x0502,

    // Pixel formats used for texture payload sizing.
    Alpha = 0x1906,
    Rgb = 0x1907,
    Rgba = 0x1908,

    UnsignedByte = 0x1401,
    Float = 0x1406,

    // Shader / program parameters.
    FragmentShader = 0x8B30,
    VertexShader = 0x8B31,
    ShaderType = 0x8B4F,
    DeleteStatus = 0x8B80,
    CompileStatus = 0x8B81,
    LinkStatus = 0x8B82,
    InfoLogLength = 0x8B84,
    AttachedShaders = 0x8B85,
    ActiveUniforms = 0x8B86,
    ActiveUniformMaxLength = 0x8B87,
    ShaderSourceLength = 0x8B88,
    ActiveAttributes = 0x8B89,
    ActiveAttributeMaxLength = 0x8B8A,
    ActiveUniformBlockMaxNameLength = 0x8A35,
    ActiveUniformBlocks = 0x8A36,

    // Trivial integer queries answered without the native context.
    ShaderBinaryFormats = 0x8DF8,
    NumShaderBinaryFormats = 0x8DF9,
    ShaderCompiler = 0x8DFA,
    NumProgramBinaryFormats = 0x87FE,
    NumCompressedTextureFormats = 0x86A2,
    CompressedTextureFormats = 0x86A3,
    MajorVersion = 0x821B,
    MinorVersion = 0x821C,
    NumExtensions = 0x821D,

    // Binding queries whose null result means "nothing bound".
    ArrayBufferBinding = 0x8894,
    ElementArrayBufferBinding = 0x8895,
    CurrentProgram = 0x8B8D,
    FramebufferBinding = 0x8CA6,
    RenderbufferBinding = 0x8CA7,
    TextureBinding2d = 0x8069,
    TextureBindingCubeMap = 0x8514,
    VertexArrayBinding = 0x85B5,
    SamplerBinding = 0x8919,
    TransformFeedbackBinding = 0x8E25,

    // Binding targets the headless context tracks.
    ArrayBuffer = 0x8892,
    ElementArrayBuffer = 0x8893,
    Texture2d = 0x0DE1,
    TextureCubeMap = 0x8513,
    Framebuffer = 0x8D40,
    Renderbuffer = 0x8D41,

    // Misc state queries.
    Viewport = 0x0BA2,
    ColorClearValue = 0x0C22,
    MaxTextureSize = 0x0D33,
    Version = 0x1F02,

    // Query objects.
    QueryResult = 0x8866,
    QueryResultAvailable = 0x8867,
}

impl GlEnum {
    pub const fn value(self) -> u32 {
        self as u32
    }

    pub const fn from_u32(v: u32) -> Option<Self> {
        use GlEnum::*;
        Some(match v {
            0 => NoError,
            0x0500 => InvalidEnum,
            0x0501 => InvalidValue,
            0x0502 => InvalidOperation,
            0x1906 => Alpha,
            0x1907 => Rgb,
            0x1908 => Rgba,
            0x1401 => UnsignedByte,
            0x1406 => Float,
            0x8B30 => FragmentShader,
            0x8B31 => VertexShader,
            0x8B4F => ShaderType,
            0x8B80 => DeleteStatus,
            0x8B81 => CompileStatus,
            0x8B82 => LinkStatus,
            0x8B84 => InfoLogLength,
            0x8B85 => AttachedShaders,
            0x8B86 => ActiveUniforms,
            0x8B87 => ActiveUniformMaxLength,
            0x8B88 => ShaderSourceLength,
            0x8B89 => ActiveAttributes,
            0x8B8A => ActiveAttributeMaxLength,
            0x8A35 => ActiveUniformBlockMaxNameLength,
            0x8A36 => ActiveUniformBlocks,
            0x8DF8 => ShaderBinaryFormats,
            0x8DF9 => NumShaderBinaryFormats,
            0x8DFA => ShaderCompiler,
            0x87FE => NumProgramBinaryFormats,
            0x86A2 => NumCompressedTextureFormats,
            0x86A3 => CompressedTextureFormats,
            0x821B => MajorVersion,
            0x821C => MinorVersion,
            0x821D => NumExtensions,
            0x8894 => ArrayBufferBinding,
            0x8895 => ElementArrayBufferBinding,
            0x8B8D => CurrentProgram,
            0x8CA6 => FramebufferBinding,
            0x8CA7 => RenderbufferBinding,
            0x8069 => TextureBinding2d,
            0x8514 => TextureBindingCubeMap,
            0x85B5 => VertexArrayBinding,
            0x8919 => SamplerBinding,
            0x8E25 => TransformFeedbackBinding,
            0x8892 => ArrayBuffer,
            0x8893 => ElementArrayBuffer,
            0x0DE1 => Texture2d,
            0x8513 => TextureCubeMap,
            0x8D40 => Framebuffer,
            0x8D41 => Renderbuffer,
            0x0BA2 => Viewport,
            0x0C22 => ColorClearValue,
            0x0D33 => MaxTextureSize,
            0x1F02 => Version,
            0x8866 => QueryResult,
            0x8867 => QueryResultAvailable,
            _ => return None,
        })
    }

    /// Binding queries for which "nothing bound" is a legitimate answer.
    pub const fn is_binding_query(self) -> bool {
        matches!(
            self,
            GlEnum::ArrayBufferBinding
                | GlEnum::CurrentProgram
                | GlEnum::ElementArrayBufferBinding
                | GlEnum::FramebufferBinding
                | GlEnum::RenderbufferBinding
                | GlEnum::TextureBinding2d
                | GlEnum::VertexArrayBinding
                | GlEnum::SamplerBinding
                | GlEnum::TransformFeedbackBinding
                | GlEnum::TextureBindingCubeMap
        )
    }
}
