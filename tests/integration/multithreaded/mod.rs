mod codec_concurrency_test;
