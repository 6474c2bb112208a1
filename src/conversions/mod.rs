/*!
Conversions applied to decoded frames on their way out of the render pipeline.

This includes channel mapping (stereo track selection and downmix) and encoding
normalized samples into the requested output sample format.
*/
pub use self::channels::ChannelMapper;
pub use self::sample::encode_samples;

mod channels;
mod sample;
