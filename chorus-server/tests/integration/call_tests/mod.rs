mod test_audio_fan_out;
mod test_join_call;
