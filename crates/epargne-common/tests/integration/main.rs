mod test_envelope;
